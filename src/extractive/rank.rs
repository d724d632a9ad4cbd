//! TextRank centrality over a sentence similarity graph.

use std::collections::BTreeSet;

/// Normalized shared-term overlap between two sentences.
///
/// `|a ∩ b| / (ln(1 + |a|) + ln(1 + |b|))`; zero when either side has no
/// content terms.
pub(crate) fn similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    if shared == 0 {
        return 0.0;
    }
    let norm = (1.0 + a.len() as f64).ln() + (1.0 + b.len() as f64).ln();
    shared as f64 / norm
}

/// Parameters of the iterative ranking.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RankParams {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// Weighted PageRank over the sentence graph.
///
/// Iterates until the L1 change between rounds drops below `tolerance` or
/// `max_iterations` rounds have run. All loops walk indices in order, so
/// the result is bit-for-bit reproducible.
pub(crate) fn rank(terms: &[BTreeSet<String>], params: RankParams) -> Vec<f64> {
    let n = terms.len();
    if n == 0 {
        return Vec::new();
    }

    let mut weights = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = similarity(&terms[i], &terms[j]);
            weights[i][j] = w;
            weights[j][i] = w;
        }
    }
    let out_weight: Vec<f64> = weights.iter().map(|row| row.iter().sum()).collect();

    let base = (1.0 - params.damping) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];

    for _ in 0..params.max_iterations {
        let mut next = vec![base; n];
        for (i, slot) in next.iter_mut().enumerate() {
            for j in 0..n {
                let w = weights[j][i];
                if w > 0.0 && out_weight[j] > 0.0 {
                    *slot += params.damping * w / out_weight[j] * scores[j];
                }
            }
        }

        let delta: f64 = next
            .iter()
            .zip(scores.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        scores = next;
        if delta < params.tolerance {
            break;
        }
    }

    scores
}
