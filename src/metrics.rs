//! Network metrics over projected matrices.
//!
//! Every function accepts `Option<&Matrix>`: a relation with no entities
//! projects to `None`, and a metric of `None` (or of a matrix with a zero
//! dimension) is 0 or an empty vector. Callers can request any metric for
//! any relation without checking for emptiness first.

use crate::matrix::Matrix;

/// Below this, a normalizing denominator counts as zero.
pub const TOLERANCE: f32 = 1e-6;

fn non_empty(m: Option<&Matrix>) -> Option<&Matrix> {
    m.filter(|m| !m.is_empty())
}

/// `sum(cells) / (rows * cols)`.
pub fn density(m: Option<&Matrix>) -> f32 {
    match non_empty(m) {
        Some(m) => m.sum() / (m.rows() * m.cols()) as f32,
        None => 0.0,
    }
}

/// `sum(cells) / cols`: average weight carried per target.
pub fn load(m: Option<&Matrix>) -> f32 {
    match non_empty(m) {
        Some(m) => m.sum() / m.cols() as f32,
        None => 0.0,
    }
}

/// Row sums divided by the number of columns.
pub fn row_degree_centrality(m: Option<&Matrix>) -> Vec<f32> {
    match non_empty(m) {
        Some(m) => {
            let cols = m.cols() as f32;
            m.row_sums().into_iter().map(|s| s / cols).collect()
        }
        None => Vec::new(),
    }
}

/// Column sums divided by the number of rows.
pub fn column_degree_centrality(m: Option<&Matrix>) -> Vec<f32> {
    match non_empty(m) {
        Some(m) => {
            let rows = m.rows() as f32;
            m.col_sums().into_iter().map(|s| s / rows).collect()
        }
        None => Vec::new(),
    }
}

/// Degree centralization of the whole matrix, in `[0, 1]`.
///
/// Each cell's centrality is `cell / cols`. With `D` the largest cell
/// centrality, every row accumulates its shortfall `Σ_j (D - c_ij)`; the
/// result is the mean row shortfall relative to the largest one. A matrix
/// whose cells are all equal has no shortfall and scores 0.
pub fn degree_centralization(m: Option<&Matrix>) -> f32 {
    let Some(m) = non_empty(m) else {
        return 0.0;
    };
    let cols = m.cols() as f32;
    let centrality = m.map(|v| v / cols);
    let max_degree = centrality.max();
    let shortfall = centrality.map(|c| max_degree - c).row_sums();
    normalized_mean(&shortfall)
}

/// Degree centralization restricted to rows: shortfalls of each row's
/// degree centrality against the most central row.
pub fn row_degree_centralization(m: Option<&Matrix>) -> f32 {
    axis_centralization(&row_degree_centrality(m))
}

/// Degree centralization restricted to columns.
pub fn column_degree_centralization(m: Option<&Matrix>) -> f32 {
    axis_centralization(&column_degree_centrality(m))
}

fn axis_centralization(centrality: &[f32]) -> f32 {
    let max_degree = centrality.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let shortfall: Vec<f32> = centrality.iter().map(|c| max_degree - c).collect();
    normalized_mean(&shortfall)
}

/// `sum(values) / (len * max(values))`, or 0 when the maximum is within
/// tolerance of zero.
fn normalized_mean(values: &[f32]) -> f32 {
    let max = values.iter().copied().fold(0.0_f32, f32::max);
    if max <= TOLERANCE {
        return 0.0;
    }
    values.iter().sum::<f32>() / (values.len() as f32 * max)
}
