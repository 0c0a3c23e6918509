use serde::{Deserialize, Serialize};

/// Produit vendu par la boutique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub requires_cold_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une quantité ; fusionne avec la ligne existante du même produit
    pub fn add(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|line| line.product.id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.items.push(CartLine { product, quantity }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|line| line.quantity == 0)
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(CartLine::total).sum()
    }

    /// Vrai dès qu'un produit du panier doit voyager au froid
    pub fn requires_cold_chain(&self) -> bool {
        self.items.iter().any(|line| line.quantity > 0 && line.product.requires_cold_chain)
    }
}
