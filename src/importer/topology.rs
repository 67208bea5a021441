//! Grouping flat index lists into triangles

/// Triangles of a fan around `indices[0]`
pub(crate) fn fan_triangles(indices: &[usize]) -> Vec<[usize; 3]> {
    if indices.len() < 3 {
        return Vec::new();
    }
    (1..indices.len() - 1)
        .map(|i| [indices[0], indices[i], indices[i + 1]])
        .collect()
}

/// Triangles of a strip; every second triangle has its last two corners
/// swapped so all triangles keep the winding of the first one
pub(crate) fn strip_triangles(indices: &[usize]) -> Vec<[usize; 3]> {
    if indices.len() < 3 {
        return Vec::new();
    }
    (0..indices.len() - 2)
        .map(|i| {
            let (v0, v1, v2) = (indices[i], indices[i + 1], indices[i + 2]);
            if i % 2 == 0 { [v0, v1, v2] } else { [v0, v2, v1] }
        })
        .collect()
}

/// Triangles of a strip list where a negative index restarts the strip
pub(crate) fn restarting_strip_triangles(indices: &[i64]) -> Vec<[usize; 3]> {
    indices
        .split(|index| *index < 0)
        .flat_map(|strip| {
            let strip: Vec<usize> = strip.iter().map(|index| *index as usize).collect();
            strip_triangles(&strip)
        })
        .collect()
}

/// Triangles of a plain triangle list; a trailing partial triangle is dropped
pub(crate) fn list_triangles(indices: &[usize]) -> Vec<[usize; 3]> {
    indices
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan() {
        assert_eq!(
            fan_triangles(&[0, 1, 2, 3, 4]),
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]
        );
        assert!(fan_triangles(&[0, 1]).is_empty());
    }

    #[test]
    fn test_strip_alternates_winding() {
        assert_eq!(
            strip_triangles(&[0, 1, 2, 3, 4]),
            vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]]
        );
    }

    #[test]
    fn test_strip_restart() {
        assert_eq!(
            restarting_strip_triangles(&[0, 1, 2, 3, -1, 4, 5, 6]),
            vec![[0, 1, 2], [1, 3, 2], [4, 5, 6]]
        );
        assert_eq!(
            restarting_strip_triangles(&[0, 1, -1, 2, 3, 4]),
            vec![[2, 3, 4]]
        );
    }

    #[test]
    fn test_list() {
        assert_eq!(
            list_triangles(&[0, 1, 2, 3, 4, 5, 6]),
            vec![[0, 1, 2], [3, 4, 5]]
        );
    }
}
