use crate::models::{Inventory, StationMetadata, StationRegistry};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataReconciliation {
    pub registry: StationRegistry,
    pub dropped: usize,
    pub appended: usize,
}

/// Align the registry with the stations the inventory actually holds.
///
/// Rows for stations absent from the inventory are dropped, and every
/// inventory station missing from the registry gets an identity-only row.
pub fn reconcile(inventory: &Inventory, mut registry: StationRegistry) -> MetadataReconciliation {
    let observed = inventory.station_ids();

    let before = registry.len();
    registry.retain(|id| observed.contains(id));
    let dropped = before - registry.len();

    let missing: Vec<_> = observed
        .into_iter()
        .filter(|id| !registry.contains(id))
        .collect();
    let appended = missing.len();
    for id in missing {
        registry.insert(StationMetadata::minimal(id));
    }

    info!(dropped, appended, stations = registry.len(), "Reconciled station registry");

    MetadataReconciliation {
        registry,
        dropped,
        appended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryRow, StationId};
    use crate::utils::time::epoch;

    fn inventory(ids: &[&str]) -> Inventory {
        ids.iter()
            .map(|id| InventoryRow {
                station: id.parse().unwrap(),
                year: 2010,
                last_updated: epoch(),
                monthly_counts: [0; 12],
            })
            .collect()
    }

    fn named(id: &str) -> StationMetadata {
        StationMetadata {
            name: Some(format!("STATION {}", id)),
            ..StationMetadata::minimal(id.parse().unwrap())
        }
    }

    #[test]
    fn test_reconcile_drops_and_appends() {
        let inventory = inventory(&["010010-99999", "010020-99999"]);
        let registry: StationRegistry = vec![named("010010-99999"), named("999999-00100")]
            .into_iter()
            .collect();

        let result = reconcile(&inventory, registry);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.appended, 1);
        assert_eq!(result.registry.ids(), inventory.station_ids());

        let appended = result
            .registry
            .get(&StationId::new("010020", "99999"))
            .unwrap();
        assert!(!appended.has_descriptive_attributes());

        let kept = result
            .registry
            .get(&StationId::new("010010", "99999"))
            .unwrap();
        assert_eq!(kept.name.as_deref(), Some("STATION 010010-99999"));
    }

    #[test]
    fn test_reconcile_is_stable() {
        let inventory = inventory(&["010010-99999"]);
        let first = reconcile(&inventory, vec![named("010010-99999")].into_iter().collect());
        let second = reconcile(&inventory, first.registry.clone());

        assert_eq!(second.registry, first.registry);
        assert_eq!((second.dropped, second.appended), (0, 0));
    }

    #[test]
    fn test_empty_inventory_empties_registry() {
        let result = reconcile(&Inventory::new(), vec![named("010010-99999")].into_iter().collect());
        assert!(result.registry.is_empty());
        assert_eq!(result.dropped, 1);
    }
}
