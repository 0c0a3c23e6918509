/**
 * RÈGLES D'ENVOI - Tarification des livraisons par paliers
 *
 * RÔLE : Associe (sous-total, distance boutique → client) à un coût d'envoi.
 *
 * PALIERS :
 * - sous-total > 50 000 ET distance <= 20 km  → envoi gratuit
 * - 25 000 <= sous-total < 50 000              → 150 / km
 * - sous-total < 25 000                        → 300 / km
 * - sinon (>= 50 000 mais hors rayon)          → 150 / km (repli)
 *
 * Fonctions pures : aucune synchronisation nécessaire.
 */

use crate::geo::{distance_km, Coordinate, GeoError};
use serde::Serialize;

pub const FREE_SHIPPING_MIN_SUBTOTAL: f64 = 50_000.0;
pub const FREE_SHIPPING_RADIUS_KM: f64 = 20.0;
pub const MID_TIER_MIN_SUBTOTAL: f64 = 25_000.0;
pub const REDUCED_RATE_PER_KM: f64 = 150.0;
pub const STANDARD_RATE_PER_KM: f64 = 300.0;

/// Palier tarifaire retenu pour un devis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingTier {
    /// Gros panier livré dans le rayon gratuit
    FreeLocal,
    /// Sous-total dans [25 000, 50 000)
    MidSubtotal,
    /// Sous-total < 25 000
    SmallSubtotal,
    /// Sous-total >= 50 000 hors du rayon gratuit
    LargeSubtotalFallback,
}

impl ShippingTier {
    pub fn rate_per_km(&self) -> f64 {
        match self {
            ShippingTier::FreeLocal => 0.0,
            ShippingTier::MidSubtotal | ShippingTier::LargeSubtotalFallback => REDUCED_RATE_PER_KM,
            ShippingTier::SmallSubtotal => STANDARD_RATE_PER_KM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShippingQuote {
    pub distance_km: f64,
    pub tier: ShippingTier,
    pub fee: f64,
}

/// Sélection du palier, dans l'ordre exact des règles.
pub fn select_tier(subtotal: f64, distance_km: f64) -> ShippingTier {
    if subtotal > FREE_SHIPPING_MIN_SUBTOTAL && distance_km <= FREE_SHIPPING_RADIUS_KM {
        return ShippingTier::FreeLocal;
    }
    // borne haute 49 999 sur des montants entiers => < 50 000 pour les fractions
    if (MID_TIER_MIN_SUBTOTAL..FREE_SHIPPING_MIN_SUBTOTAL).contains(&subtotal) {
        return ShippingTier::MidSubtotal;
    }
    if subtotal < MID_TIER_MIN_SUBTOTAL {
        return ShippingTier::SmallSubtotal;
    }
    ShippingTier::LargeSubtotalFallback
}

/// Devis pour une distance déjà connue.
pub fn quote_for_distance(subtotal: f64, distance_km: f64) -> ShippingQuote {
    let tier = select_tier(subtotal, distance_km);
    ShippingQuote {
        distance_km,
        tier,
        fee: distance_km * tier.rate_per_km(),
    }
}

/// Coût d'envoi entre la boutique et le client.
pub fn shipping_fee(subtotal: f64, store: &Coordinate, client: &Coordinate) -> f64 {
    quote_for_distance(subtotal, distance_km(store, client)).fee
}

/// Règles d'envoi liées à la boutique configurée pour ce déploiement
#[derive(Debug, Clone, Copy)]
pub struct ShippingRules {
    store: Coordinate,
}

impl ShippingRules {
    pub fn new(store: Coordinate) -> Self {
        Self { store }
    }

    pub fn quote(&self, subtotal: f64, client: &Coordinate) -> ShippingQuote {
        quote_for_distance(subtotal, distance_km(&self.store, client))
    }

    /// Version sur degrés bruts : propage `InvalidCoordinate` si le client est hors domaine
    pub fn shipping_fee(&self, subtotal: f64, latitude: f64, longitude: f64) -> Result<f64, GeoError> {
        let client = Coordinate::new(latitude, longitude)?;
        Ok(self.quote(subtotal, &client).fee)
    }
}
