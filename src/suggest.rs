/// Number of single-char insertions, deletions and substitutions turning
/// `from` into `to`.
///
/// Shared prefix and suffix are stripped first; identifiers that differ in
/// one spot then only pay for the differing middle.
pub fn edit_distance(from: &str, to: &str) -> usize {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    let prefix = from.iter().zip(&to).take_while(|(x, y)| x == y).count();
    let (from, to) = (&from[prefix..], &to[prefix..]);
    let suffix = from
        .iter()
        .rev()
        .zip(to.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (from, to) = (&from[..from.len() - suffix], &to[..to.len() - suffix]);

    // costs[j]: distance from the consumed part of `from` to to[..j].
    let mut costs: Vec<usize> = (0..=to.len()).collect();
    for (i, &source) in from.iter().enumerate() {
        let mut diagonal = costs[0];
        costs[0] = i + 1;
        for (j, &target) in to.iter().enumerate() {
            let above = costs[j + 1];
            costs[j + 1] = if source == target {
                diagonal
            } else {
                1 + diagonal.min(above).min(costs[j])
            };
            diagonal = above;
        }
    }
    costs[to.len()]
}

/// Closest candidate to `name`, if any is near enough to be a plausible typo.
pub fn closest<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let threshold = (name.chars().count() / 3).max(1);
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= threshold)
        .min_by(|(a, a_name), (b, b_name)| a.cmp(b).then_with(|| a_name.cmp(b_name)))
        .map(|(_, candidate)| candidate.to_string())
}

/// `did you mean` help text for the closest candidate.
pub fn did_you_mean<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    closest(name, candidates).map(|candidate| format!("did you mean `{candidate}`?"))
}
