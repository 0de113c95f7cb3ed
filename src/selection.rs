use std::cmp::Ordering;

/// Indices of `fitness` ordered best first. The sort is stable, so equal
/// scores keep their original relative order.
pub fn rank_by_fitness(fitness: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| {
        fitness[b]
            .partial_cmp(&fitness[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// The top `floor(population_size / 2)` ranked indices, or fewer when the
/// population has shrunk below that.
pub fn breeding_pool(fitness: &[f32], population_size: usize) -> Vec<usize> {
    let mut ranked = rank_by_fitness(fitness);
    ranked.truncate(population_size / 2);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_with_stable_ties() {
        let fitness = [3.0, 9.0, 3.0, 1.0, 9.0, 3.0];
        assert_eq!(rank_by_fitness(&fitness), vec![1, 4, 0, 2, 5, 3]);
    }

    #[test]
    fn pool_keeps_floor_half_of_configured_size() {
        let fitness = [3.0, 9.0, 3.0, 1.0, 9.0, 3.0, 2.0];
        assert_eq!(breeding_pool(&fitness, 7), vec![1, 4, 0]);
        assert_eq!(breeding_pool(&fitness, 6), vec![1, 4, 0]);
        assert_eq!(breeding_pool(&fitness, 4), vec![1, 4]);
    }

    #[test]
    fn pool_is_limited_by_survivors() {
        assert_eq!(breeding_pool(&[5.0], 10), vec![0]);
        assert!(breeding_pool(&[], 10).is_empty());
        assert!(breeding_pool(&[5.0, 4.0], 1).is_empty());
    }

    #[test]
    fn nan_scores_do_not_reorder_neighbours() {
        let fitness = [2.0, f32::NAN, 2.0];
        let ranked = rank_by_fitness(&fitness);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked.iter().filter(|&&i| i == 1).count(), 1);
    }
}
