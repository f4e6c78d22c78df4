//! Soft references between collections
//!
//! Plots point at farms, and crops at farms and plots, by copying the display
//! name into a field. Nothing keeps those copies in sync: renaming or deleting
//! a farm leaves its plots and crops pointing at a name that no longer exists.
//! The helpers here filter by those names, and optionally report or repair
//! references that no longer resolve.

use std::fmt;

use crate::collection::CollectionStore;
use crate::error::FincaError;
use crate::models::{CollectionKey, Crop, Plot, Record};

/// A field whose value is expected to equal another collection's field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftReference {
    /// Collection holding the referring field
    pub source: CollectionKey,
    /// Stored name of the referring field
    pub field: &'static str,
    /// Collection being referred to
    pub target: CollectionKey,
    /// Stored name of the referred field
    pub target_field: &'static str,
}

impl fmt::Display for SoftReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.field, self.target, self.target_field
        )
    }
}

pub const PLOT_FARM: SoftReference = SoftReference {
    source: CollectionKey::Plots,
    field: "fincaSeleccionada",
    target: CollectionKey::Farms,
    target_field: "fincaName",
};

pub const CROP_FARM: SoftReference = SoftReference {
    source: CollectionKey::Crops,
    field: "fincaSeleccionada",
    target: CollectionKey::Farms,
    target_field: "fincaName",
};

/// Resolved within the crop's farm, see [`dangling_crop_plots`]
pub const CROP_PLOT: SoftReference = SoftReference {
    source: CollectionKey::Crops,
    field: "loteSeleccionado",
    target: CollectionKey::Plots,
    target_field: "nombre",
};

/// Users carry the base role picked from the catalog ("Operario") while
/// roles are stored with a suffix ("Operario 1"), so this one never
/// resolves by equality and is not checked.
pub const USER_ROLE: SoftReference = SoftReference {
    source: CollectionKey::Users,
    field: "role",
    target: CollectionKey::Roles,
    target_field: "roleName",
};

/// Records whose `field` equals `value` exactly, in their original order
pub fn filter_by_foreign_key<R: Record>(records: &[R], field: &str, value: &str) -> Vec<R> {
    records
        .iter()
        .filter(|r| r.field(field).as_deref() == Some(value))
        .cloned()
        .collect()
}

/// Plots offered once a farm is selected
pub fn plots_for_farm(plots: &[Plot], farm: &str) -> Vec<Plot> {
    filter_by_foreign_key(plots, PLOT_FARM.field, farm)
}

/// Crops on one plot of one farm
pub fn crops_for_plot(crops: &[Crop], farm: &str, plot: &str) -> Vec<Crop> {
    crops
        .iter()
        .filter(|c| c.farm == farm && c.plot == plot)
        .cloned()
        .collect()
}

/// Indices of `records` whose reference does not match any target
pub fn dangling_references<R: Record, T: Record>(
    records: &[R],
    reference: &SoftReference,
    targets: &[T],
) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            let value = r.field(reference.field);
            !targets
                .iter()
                .any(|t| t.field(reference.target_field) == value)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Indices of crops whose plot does not exist within the crop's farm
pub fn dangling_crop_plots(crops: &[Crop], plots: &[Plot]) -> Vec<usize> {
    crops
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            let farm = c.field(CROP_FARM.field);
            let plot = c.field(CROP_PLOT.field);
            !plots.iter().any(|p| {
                p.field(PLOT_FARM.field) == farm && p.field(CROP_PLOT.target_field) == plot
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Rewrites farm references from `old` to `new` in plots and crops.
///
/// Only used when rename cascading is switched on; by default a renamed
/// farm orphans its plots and crops.
pub fn cascade_farm_rename(
    plots: &[Plot],
    crops: &[Crop],
    old: &str,
    new: &str,
) -> (Vec<Plot>, Vec<Crop>) {
    let plots = plots
        .iter()
        .cloned()
        .map(|mut p| {
            if p.farm == old {
                p.farm = new.to_string();
            }
            p
        })
        .collect();
    let crops = crops
        .iter()
        .cloned()
        .map(|mut c| {
            if c.farm == old {
                c.farm = new.to_string();
            }
            c
        })
        .collect();
    (plots, crops)
}

/// What happened to plots and crops when a farm was renamed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmRename {
    /// Plots and crops that referred to the old name
    pub affected: usize,
    /// Whether those references were rewritten to the new name
    pub cascaded: bool,
}

/// Applies a farm rename to the stored plots and crops.
///
/// With `cascade` off nothing is written and the affected records are left
/// pointing at `old`. With it on, both collections are rewritten and saved.
/// Reads are strict so a corrupt collection is never overwritten.
pub async fn apply_farm_rename(
    store: &CollectionStore,
    old: &str,
    new: &str,
    cascade: bool,
) -> Result<FarmRename, FincaError> {
    let plots = store.load::<Plot>().await?;
    let crops = store.load::<Crop>().await?;

    let affected = plots.iter().filter(|p| p.farm == old).count()
        + crops.iter().filter(|c| c.farm == old).count();

    if affected == 0 || !cascade || old == new {
        return Ok(FarmRename {
            affected,
            cascaded: false,
        });
    }

    let (plots, crops) = cascade_farm_rename(&plots, &crops, old, new);
    store.save(&plots).await?;
    store.save(&crops).await?;

    tracing::info!(old, new, affected, "cascaded farm rename");
    Ok(FarmRename {
        affected,
        cascaded: true,
    })
}
