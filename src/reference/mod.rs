// src/reference/mod.rs
use anyhow::{bail, Context, Result};
use tracing::{info, instrument};

use crate::grid::{Grid, GridSource};
use crate::process::columns::ColumnMap;
use crate::process::dedup::dedup_first;
use crate::process::filter::is_blank_row;
use crate::process::header::build_headers;
use crate::schema::fields::{material_aliases, MaterialField as F};
use crate::schema::MaterialTarget;

/// Reads the first sheet of the material-master workbook.
pub fn read_materials_sheet<S: GridSource>(source: &mut S) -> Result<(String, Grid)> {
    let Some(name) = source.sheet_names().into_iter().next() else {
        bail!("material workbook has no sheets");
    };
    let grid = source
        .read_sheet(&name)
        .with_context(|| format!("reading material sheet `{}`", name))?;
    Ok((name, grid))
}

/// Targets per material code. Header is row 0; rows without a material code
/// are dropped and repeated codes keep their first row.
#[instrument(level = "info", skip(grid), fields(rows = grid.len()))]
pub fn build_material_targets(grid: &Grid) -> Result<Vec<MaterialTarget>> {
    let Some(header) = grid.row(0) else {
        bail!("material sheet is empty");
    };
    let headers = build_headers(header);
    let columns = ColumnMap::resolve(&headers, &material_aliases());
    if !columns.is_bound(F::MaterialCode) {
        bail!("material sheet has no material code column");
    }

    let records: Vec<MaterialTarget> = grid.rows()[1..]
        .iter()
        .filter(|row| !is_blank_row(&headers, row))
        .filter_map(|row| {
            let material_code = columns.text(row, F::MaterialCode);
            if material_code.is_empty() {
                return None;
            }
            Some(MaterialTarget {
                material_code,
                size_code: columns.text(row, F::SizeCode),
                family: columns.text(row, F::Family),
                linear_mass: columns.number(row, F::LinearMass),
                gas_target: columns.number(row, F::GasTarget),
                energy_target: columns.number(row, F::EnergyTarget),
                metallic_yield: columns.number(row, F::MetallicYield),
            })
        })
        .collect();

    let total = records.len();
    let unique = dedup_first(records, |r| r.material_code.clone());
    info!(rows = total, unique = unique.len(), "material targets prepared");
    Ok(unique)
}
