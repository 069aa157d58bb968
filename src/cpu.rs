//! CPU core partitioning across instances
//!
//! Splits the host's logical cores as evenly as possible, in instance
//! order, with no sharing and no idle cores. Core lists are rendered as
//! comma-joined strings ("0,1,2,3") ready for affinity tooling and logs.

/// Partition `0..cpu_count` into `num_instances` ordered core lists.
///
/// Sizes are `cpu_count / num_instances`, with the first
/// `cpu_count % num_instances` instances receiving one extra core.
pub fn partition_cores(cpu_count: usize, num_instances: usize) -> Vec<String> {
    let mut assignments = Vec::with_capacity(num_instances);
    if num_instances == 0 {
        return assignments;
    }

    let cores_per_instance = cpu_count / num_instances;
    let mut remaining = cpu_count % num_instances;
    let mut next_core = 0;

    for _ in 0..num_instances {
        let mut count = cores_per_instance;
        if remaining > 0 {
            count += 1;
            remaining -= 1;
        }
        let cores: Vec<String> = (next_core..next_core + count).map(|c| c.to_string()).collect();
        assignments.push(cores.join(","));
        next_core += count;
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(assignment: &str) -> Vec<usize> {
        if assignment.is_empty() {
            return vec![];
        }
        assignment.split(',').map(|c| c.parse().unwrap()).collect()
    }

    #[test]
    fn test_even_split() {
        assert_eq!(partition_cores(8, 2), vec!["0,1,2,3", "4,5,6,7"]);
    }

    #[test]
    fn test_remainder_goes_to_first_instances() {
        // 7 cores / 3 instances: sizes 3, 2, 2
        assert_eq!(partition_cores(7, 3), vec!["0,1,2", "3,4", "5,6"]);
    }

    #[test]
    fn test_more_instances_than_cores() {
        // 2 cores / 3 instances: first two get one core, last gets none
        assert_eq!(partition_cores(2, 3), vec!["0", "1", ""]);
    }

    #[test]
    fn test_zero_instances() {
        assert!(partition_cores(8, 0).is_empty());
    }

    #[test]
    fn test_partition_properties() {
        for cpu_count in 1..=16 {
            for num_instances in 1..=6 {
                let assignments = partition_cores(cpu_count, num_instances);
                assert_eq!(assignments.len(), num_instances);

                // Union covers 0..cpu_count exactly once, in order
                let all: Vec<usize> =
                    assignments.iter().flat_map(|a| parse(a)).collect();
                assert_eq!(all, (0..cpu_count).collect::<Vec<_>>());

                // Sizes differ by at most 1, larger shares first
                let sizes: Vec<usize> = assignments.iter().map(|a| parse(a).len()).collect();
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1);
                let bigger = cpu_count % num_instances;
                for (i, size) in sizes.iter().enumerate() {
                    let expected = cpu_count / num_instances + usize::from(i < bigger);
                    assert_eq!(*size, expected);
                }
            }
        }
    }
}
