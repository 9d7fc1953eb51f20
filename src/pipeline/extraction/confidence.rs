use super::types::WordConfidence;

/// Mean of the usable word confidences on one page, `None` if there are none.
pub fn page_confidence(words: &[WordConfidence]) -> Option<f64> {
    let (sum, count) = words
        .iter()
        .filter_map(WordConfidence::usable)
        .fold((0.0_f64, 0_usize), |(sum, count), c| (sum + c as f64, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Compute overall document confidence from per-page word confidences.
///
/// Two-stage mean: each page is averaged first, then the page means are
/// averaged. Pages are not weighted by word count, and pages
/// without a usable value are skipped rather than counted as zero.
pub fn aggregate_confidence<P>(pages: &[P]) -> Option<f64>
where
    P: AsRef<[WordConfidence]>,
{
    let page_means: Vec<f64> = pages
        .iter()
        .filter_map(|p| page_confidence(p.as_ref()))
        .collect();

    if page_means.is_empty() {
        return None;
    }

    Some(page_means.iter().sum::<f64>() / page_means.len() as f64)
}
