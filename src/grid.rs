use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::{QcError, Result};

/// Fraction of a cell by which two grids' cell sizes and origins may disagree
/// and still be treated as the same grid lattice.
const ALIGN_TOL: f64 = 1e-6;

/// A raster band held in memory as a north-up grid of `f64` values.
///
/// `transform` is the usual GDAL affine: `x = t0 + col * t1`,
/// `y = t3 + row * t5` with `t5 < 0` for north-up data. Rotated transforms
/// are rejected at construction.
#[derive(Debug, Clone)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub transform: [f64; 6],
    pub nodata: Option<f64>,
    values: Vec<f64>,
}

impl Grid {
    pub fn new(
        cols: usize,
        rows: usize,
        transform: [f64; 6],
        nodata: Option<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(QcError::InvalidGrid("empty raster".into()));
        }
        if values.len() != cols * rows {
            return Err(QcError::InvalidGrid(format!(
                "value count {} does not match {}x{}",
                values.len(),
                cols,
                rows
            )));
        }
        if transform[2] != 0.0 || transform[4] != 0.0 {
            return Err(QcError::InvalidGrid("rotated transform".into()));
        }
        if transform[1] == 0.0 || transform[5] == 0.0 {
            return Err(QcError::InvalidGrid("zero cell size".into()));
        }
        Ok(Grid { cols, rows, transform, nodata, values })
    }

    pub fn cell_width(&self) -> f64 {
        self.transform[1]
    }

    pub fn cell_height(&self) -> f64 {
        self.transform[5]
    }

    /// Value at (row, col), or `None` outside the grid or on a nodata cell.
    pub fn value(&self, row: i64, col: i64) -> Option<f64> {
        if row < 0 || col < 0 || row >= self.rows as i64 || col >= self.cols as i64 {
            return None;
        }
        let v = self.values[row as usize * self.cols + col as usize];
        if v.is_nan() {
            return None;
        }
        match self.nodata {
            Some(nd) if v == nd => None,
            _ => Some(v),
        }
    }

    /// Sample the grid at a world coordinate.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let col = ((x - self.transform[0]) / self.transform[1]).floor() as i64;
        let row = ((y - self.transform[3]) / self.transform[5]).floor() as i64;
        self.value(row, col)
    }
}

/// Two grids indexed through a shared union-extent lattice.
///
/// Both grids must sit on the same lattice: equal cell size and origins offset
/// by a whole number of cells. Resampling is out of scope for the QC checks,
/// so anything else is an error.
pub struct AlignedPair<'a> {
    pub lower: &'a Grid,
    pub higher: &'a Grid,
    pub cols: usize,
    pub rows: usize,
    pub transform: [f64; 6],
    lower_off: (i64, i64),
    higher_off: (i64, i64),
}

impl<'a> AlignedPair<'a> {
    pub fn new(lower: &'a Grid, higher: &'a Grid) -> Result<AlignedPair<'a>> {
        let cw = lower.cell_width();
        let ch = lower.cell_height();
        if (higher.cell_width() - cw).abs() > cw.abs() * ALIGN_TOL
            || (higher.cell_height() - ch).abs() > ch.abs() * ALIGN_TOL
        {
            return Err(QcError::MisalignedGrids {
                detail: format!(
                    "cell sizes differ: ({}, {}) vs ({}, {})",
                    cw,
                    ch,
                    higher.cell_width(),
                    higher.cell_height()
                ),
            });
        }

        // Offset of the higher grid's origin, in cells of the lower grid.
        let dx = (higher.transform[0] - lower.transform[0]) / cw;
        let dy = (higher.transform[3] - lower.transform[3]) / ch;
        if (dx - dx.round()).abs() > ALIGN_TOL || (dy - dy.round()).abs() > ALIGN_TOL {
            return Err(QcError::MisalignedGrids {
                detail: format!("origins offset by a fractional cell: ({dx}, {dy})"),
            });
        }
        let h_col0 = dx.round() as i64;
        let h_row0 = dy.round() as i64;

        // Union extent in cell coordinates relative to the lower grid's origin.
        let col_min = 0.min(h_col0);
        let row_min = 0.min(h_row0);
        let col_max = (lower.cols as i64).max(h_col0 + higher.cols as i64);
        let row_max = (lower.rows as i64).max(h_row0 + higher.rows as i64);

        let transform = [
            lower.transform[0] + col_min as f64 * cw,
            cw,
            0.0,
            lower.transform[3] + row_min as f64 * ch,
            0.0,
            ch,
        ];

        Ok(AlignedPair {
            lower,
            higher,
            cols: (col_max - col_min) as usize,
            rows: (row_max - row_min) as usize,
            transform,
            lower_off: (row_min, col_min),
            higher_off: (row_min - h_row0, col_min - h_col0),
        })
    }

    pub fn lower_value(&self, row: usize, col: usize) -> Option<f64> {
        self.lower
            .value(row as i64 + self.lower_off.0, col as i64 + self.lower_off.1)
    }

    pub fn higher_value(&self, row: usize, col: usize) -> Option<f64> {
        self.higher
            .value(row as i64 + self.higher_off.0, col as i64 + self.higher_off.1)
    }

    /// Build a mask over the union lattice from a per-cell predicate on the
    /// (lower, higher) values.
    pub fn mask<F>(&self, pred: F) -> Mask
    where
        F: Fn(Option<f64>, Option<f64>) -> bool,
    {
        let mut bits = vec![false; self.cols * self.rows];
        for row in 0..self.rows {
            for col in 0..self.cols {
                bits[row * self.cols + col] =
                    pred(self.lower_value(row, col), self.higher_value(row, col));
            }
        }
        Mask { cols: self.cols, rows: self.rows, transform: self.transform, bits }
    }
}

/// A boolean raster over a union lattice.
#[derive(Debug, Clone)]
pub struct Mask {
    pub cols: usize,
    pub rows: usize,
    pub transform: [f64; 6],
    bits: Vec<bool>,
}

/// One 4-connected region of set mask cells; the single-part unit of the
/// difference artifacts.
#[derive(Debug, Clone)]
pub struct Component {
    pub cells: Vec<(usize, usize)>,
}

impl Mask {
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.bits[row * self.cols + col]
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Label 4-connected components in deterministic scan order.
    pub fn components(&self) -> Vec<Component> {
        let mut seen = vec![false; self.bits.len()];
        let mut out = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = row * self.cols + col;
                if !self.bits[idx] || seen[idx] {
                    continue;
                }
                let mut cells = Vec::new();
                let mut stack = vec![(row, col)];
                seen[idx] = true;
                while let Some((r, c)) = stack.pop() {
                    cells.push((r, c));
                    let mut visit = |nr: usize, nc: usize| {
                        let nidx = nr * self.cols + nc;
                        if self.bits[nidx] && !seen[nidx] {
                            seen[nidx] = true;
                            stack.push((nr, nc));
                        }
                    };
                    if r > 0 {
                        visit(r - 1, c);
                    }
                    if r + 1 < self.rows {
                        visit(r + 1, c);
                    }
                    if c > 0 {
                        visit(r, c - 1);
                    }
                    if c + 1 < self.cols {
                        visit(r, c + 1);
                    }
                }
                cells.sort_unstable();
                out.push(Component { cells });
            }
        }
        out
    }
}

/// Trace the boundary of a component into closed rings in world coordinates,
/// outer ring first.
///
/// Edges are collected per boundary cell edge and linked into rings. At a
/// pinch vertex (two boundary edges leaving the same grid corner) the walk
/// takes the sharpest turn that keeps the region on the same side, so rings
/// never cross.
pub fn component_rings(comp: &Component, transform: &[f64; 6]) -> Vec<Vec<(f64, f64)>> {
    let cells: BTreeSet<(i64, i64)> = comp
        .cells
        .iter()
        .map(|&(r, c)| (r as i64, c as i64))
        .collect();

    // Directed boundary edges in grid corner coordinates (x = col, y = row),
    // oriented so the region lies to the right of travel.
    let mut edges: BTreeMap<(i64, i64), Vec<(i64, i64)>> = BTreeMap::new();
    for &(r, c) in &cells {
        if !cells.contains(&(r - 1, c)) {
            edges.entry((c, r)).or_default().push((c + 1, r));
        }
        if !cells.contains(&(r, c + 1)) {
            edges.entry((c + 1, r)).or_default().push((c + 1, r + 1));
        }
        if !cells.contains(&(r + 1, c)) {
            edges.entry((c + 1, r + 1)).or_default().push((c, r + 1));
        }
        if !cells.contains(&(r, c - 1)) {
            edges.entry((c, r + 1)).or_default().push((c, r));
        }
    }

    let mut rings: Vec<Vec<(i64, i64)>> = Vec::new();
    while let Some((&start, _)) = edges.iter().next() {
        let mut ring = vec![start];
        let mut cur = start;
        let mut prev_dir: Option<(i64, i64)> = None;
        loop {
            let Some(outs) = edges.get_mut(&cur) else {
                break;
            };
            let idx = match prev_dir {
                Some(d) if outs.len() > 1 => {
                    let mut best = 0;
                    let mut best_cross = i64::MIN;
                    for (i, &(ex, ey)) in outs.iter().enumerate() {
                        let nd = (ex - cur.0, ey - cur.1);
                        let cross = d.0 * nd.1 - d.1 * nd.0;
                        if cross > best_cross {
                            best_cross = cross;
                            best = i;
                        }
                    }
                    best
                }
                _ => 0,
            };
            let next = outs.remove(idx);
            if outs.is_empty() {
                edges.remove(&cur);
            }
            prev_dir = Some((next.0 - cur.0, next.1 - cur.1));
            if next == start {
                break;
            }
            ring.push(next);
            cur = next;
        }
        rings.push(ring);
    }

    let mut world: Vec<Vec<(f64, f64)>> = rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|(vx, vy)| {
                    (
                        transform[0] + vx as f64 * transform[1],
                        transform[3] + vy as f64 * transform[5],
                    )
                })
                .collect()
        })
        .collect();

    // Outer ring has the largest enclosed area; holes follow.
    world.sort_by(|a, b| {
        ring_area(b)
            .abs()
            .partial_cmp(&ring_area(a).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    world
}

/// Signed shoelace area of one ring (unclosed vertex list).
pub fn ring_area(ring: &[(f64, f64)]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % ring.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Net planar area of a ring set (outer minus holes).
pub fn rings_area(rings: &[Vec<(f64, f64)>]) -> f64 {
    rings.iter().map(|r| ring_area(r)).sum::<f64>().abs()
}

/// A representative point guaranteed to fall inside the component: the center
/// of the region cell nearest the region's cell centroid.
pub fn interior_point(comp: &Component, transform: &[f64; 6]) -> (f64, f64) {
    let n = comp.cells.len().max(1) as f64;
    let mean_r = comp.cells.iter().map(|&(r, _)| r as f64).sum::<f64>() / n;
    let mean_c = comp.cells.iter().map(|&(_, c)| c as f64).sum::<f64>() / n;

    let mut best = comp.cells.first().copied().unwrap_or((0, 0));
    let mut best_d = f64::INFINITY;
    for &(r, c) in &comp.cells {
        let d = (r as f64 - mean_r).powi(2) + (c as f64 - mean_c).powi(2);
        if d < best_d {
            best_d = d;
            best = (r, c);
        }
    }
    (
        transform[0] + (best.1 as f64 + 0.5) * transform[1],
        transform[3] + (best.0 as f64 + 0.5) * transform[5],
    )
}
