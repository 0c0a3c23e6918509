/*!
# ColdChain DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant les tests du moteur coldchain avec:
- Flux de lectures scriptable, sans broker MQTT
- Builders de payloads de télémétrie
- Harness câblant moniteur + stockage mémoire + flux stub
*/

pub mod feed_stub;
pub mod payloads;
pub mod test_utils;

pub use feed_stub::{StubFeedController, StubReadingFeed};
pub use payloads::TelemetryMessageBuilder;
pub use test_utils::TestHarness;
