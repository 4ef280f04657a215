//! TileMatrixSet selection per layer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::capabilities::CapabilityStore;
use crate::parse::{find_layer, parse_layers};

/// Grid used by GOES/ABI instrument layers when nothing better is known.
pub const GRID_GOES: &str = "GoogleMapsCompatible_Level8";
/// Catch-all grid for everything else.
pub const GRID_DEFAULT: &str = "GoogleMapsCompatible_Level9";

/// Determines the TileMatrixSet bound to a layer.
///
/// The capability-declared TileMatrixSetLink is authoritative. The naming
/// heuristic is strictly a last resort for layers absent from the document
/// (the two are known to disagree for at least one layer family).
/// Bindings are cached for the life of the process.
pub struct TilingGridSelector {
    store: Arc<CapabilityStore>,
    bindings: RwLock<HashMap<String, String>>,
}

impl TilingGridSelector {
    pub fn new(store: Arc<CapabilityStore>) -> Self {
        Self {
            store,
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the grid name for a layer.
    ///
    /// A capability fetch failure falls back to the heuristic without
    /// caching, so a transient outage cannot pin a guessed grid for the
    /// rest of the process.
    pub async fn grid(&self, layer_id: &str) -> String {
        {
            let guard = self.bindings.read().await;
            if let Some(grid) = guard.get(layer_id) {
                return grid.clone();
            }
        }

        let declared = match self.store.get().await {
            Ok(xml) => match parse_layers(&xml) {
                Ok(layers) => find_layer(&layers, layer_id)
                    .and_then(|l| l.tile_matrix_sets.first().cloned()),
                Err(e) => {
                    debug!(error = %e, "capability parse failed, using grid heuristic");
                    return heuristic_grid(layer_id).to_string();
                }
            },
            Err(e) => {
                debug!(error = %e, "capability fetch failed, using grid heuristic");
                return heuristic_grid(layer_id).to_string();
            }
        };

        let grid = match declared {
            Some(grid) => grid,
            None => {
                debug!(layer = layer_id, "no TileMatrixSetLink, using grid heuristic");
                heuristic_grid(layer_id).to_string()
            }
        };

        let mut guard = self.bindings.write().await;
        guard.insert(layer_id.to_string(), grid.clone());
        grid
    }
}

/// Naming heuristic: GOES/ABI layers map to the Level8 grid, everything
/// else to Level9. Best effort only.
pub fn heuristic_grid(layer_id: &str) -> &'static str {
    let upper = layer_id.to_ascii_uppercase();
    if upper.contains("GOES") || upper.contains("ABI") {
        GRID_GOES
    } else {
        GRID_DEFAULT
    }
}
