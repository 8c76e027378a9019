//! Discrete Poisson system over the hole cells.
//!
//! Unknowns are the hole cells only; known cells enter as Dirichlet data.
//! For hole cell `p` with in-grid neighbours `N(p)`:
//!
//! ```text
//! |N(p)|·u_p − Σ_{q∈N(p), hole} u_q = Σ_{q∈N(p), known} d_q − Σ_{q∈N(p)} t(p, q)
//! ```
//!
//! where `t(p, q)` is the desired `u_q − u_p` read through
//! [`edge_target`](crate::gradient::edge_target). This is the normal
//! equation of `Σ (u_q − u_p − t(p, q))²` over every grid edge touching a
//! hole. Edges leaving the raster do not exist, so border cells have a
//! smaller degree (free/Neumann boundary) instead of an implicit zero
//! neighbour. The matrix is symmetric positive definite iff every
//! 4-connected hole component touches a known cell.
use super::solver::SolverError;
use crate::gradient::edge_target;
use crate::image::{ImageView, Raster, ValidityMask};
use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

/// Square sparse matrix in compressed sparse row layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    row_offsets: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row `(column, value)` entries.
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>) -> Self {
        let n = rows.len();
        let mut row_offsets = Vec::with_capacity(n + 1);
        let mut cols = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);
        for mut row in rows {
            row.sort_by_key(|&(c, _)| c);
            for (c, v) in row {
                cols.push(c);
                values.push(v);
            }
            row_offsets.push(cols.len());
        }
        Self {
            n,
            row_offsets,
            cols,
            values,
        }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_offsets[i]..self.row_offsets[i + 1];
        self.cols[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| self.row(i).map(|(c, v)| v * x[c]).sum::<f64>()),
        )
    }

    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| {
                self.row(i)
                    .find(|&(c, _)| c == i)
                    .map_or(0.0, |(_, v)| v)
            }),
        )
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.n, self.n);
        for i in 0..self.n {
            for (c, v) in self.row(i) {
                m[(i, c)] += v;
            }
        }
        m
    }
}

/// Assembled system plus the mapping from unknown index to grid cell.
#[derive(Clone, Debug)]
pub struct PoissonSystem {
    pub matrix: CsrMatrix,
    pub rhs: DVector<f64>,
    pub cells: Vec<(usize, usize)>,
}

/// Fails on the first 4-connected hole component with no known neighbour.
pub fn check_anchored(mask: &ValidityMask) -> Result<(), SolverError> {
    let region = mask.region();
    let mut seen = vec![false; region.len()];
    let mut queue = VecDeque::new();
    for seed in mask.hole_cells() {
        if seen[mask.idx(seed.0, seed.1)] {
            continue;
        }
        seen[mask.idx(seed.0, seed.1)] = true;
        queue.push_back(seed);
        let mut cells = 0usize;
        let mut anchored = false;
        while let Some((x, y)) = queue.pop_front() {
            cells += 1;
            for (nx, ny) in region.neighbors4(x, y) {
                let i = mask.idx(nx, ny);
                if mask.is_valid(nx, ny) {
                    anchored = true;
                } else if !seen[i] {
                    seen[i] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
        if !anchored {
            return Err(SolverError::Unanchored { cells, seed });
        }
    }
    Ok(())
}

pub fn assemble(original: &Raster, mask: &ValidityMask, gradient: &Raster) -> PoissonSystem {
    let region = mask.region();
    let cells: Vec<(usize, usize)> = mask.hole_cells().collect();
    let mut index = vec![usize::MAX; region.len()];
    for (i, &(x, y)) in cells.iter().enumerate() {
        index[mask.idx(x, y)] = i;
    }

    let mut rows = Vec::with_capacity(cells.len());
    let mut rhs = DVector::zeros(cells.len());
    for (i, &p) in cells.iter().enumerate() {
        let mut row = Vec::with_capacity(5);
        let mut degree = 0.0;
        for q in region.neighbors4(p.0, p.1) {
            degree += 1.0;
            rhs[i] -= edge_target(gradient, p, q) as f64;
            if mask.is_valid(q.0, q.1) {
                rhs[i] += original.get(q.0, q.1, 0) as f64;
            } else {
                row.push((index[mask.idx(q.0, q.1)], -1.0));
            }
        }
        row.push((i, degree));
        rows.push(row);
    }

    PoissonSystem {
        matrix: CsrMatrix::from_rows(rows),
        rhs,
        cells,
    }
}
