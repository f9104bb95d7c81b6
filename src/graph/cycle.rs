// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cycle detection over index-addressed adjacency lists.
//!
//! Three-colour depth-first search with an explicit stack, so arbitrarily deep
//! producer chains cannot overflow the call stack:
//!
//! - **White**: not yet explored
//! - **Gray**: on the current DFS path
//! - **Black**: fully explored
//!
//! Reaching a gray node closes a cycle; the path from that node to the current
//! one, plus the back edge, is returned.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Gray,
    Black,
}

/// Find one cycle in the graph given as `node -> successors`.
///
/// Returns the cycle as a node path whose last element repeats the first,
/// e.g. `[a, b, a]`, or `None` when the graph is acyclic.
pub fn find_cycle(adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut colour = vec![Colour::White; adjacency.len()];
    // (node, index of the next successor to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..adjacency.len() {
        if colour[start] != Colour::White {
            continue;
        }
        colour[start] = Colour::Gray;
        stack.push((start, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, position) = *frame;
            frame.1 += 1;

            match adjacency[node].get(position) {
                Some(&successor) => match colour[successor] {
                    Colour::White => {
                        colour[successor] = Colour::Gray;
                        stack.push((successor, 0));
                    }
                    Colour::Gray => {
                        let from = stack
                            .iter()
                            .position(|&(n, _)| n == successor)
                            .unwrap_or(0);
                        let mut cycle: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                        cycle.push(successor);
                        return Some(cycle);
                    }
                    Colour::Black => {}
                },
                None => {
                    colour[node] = Colour::Black;
                    stack.pop();
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_graphs_have_no_cycle() {
        let cases: Vec<Vec<Vec<usize>>> = vec![
            vec![],
            vec![vec![]],
            vec![vec![1], vec![2], vec![]],
            // diamond
            vec![vec![1, 2], vec![3], vec![3], vec![]],
        ];
        for adjacency in cases {
            assert_eq!(find_cycle(&adjacency), None, "{:?}", adjacency);
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        assert_eq!(find_cycle(&[vec![0]]), Some(vec![0, 0]));
    }

    #[test]
    fn two_node_cycle_names_both_members() {
        assert_eq!(find_cycle(&[vec![1], vec![0]]), Some(vec![0, 1, 0]));
    }

    #[test]
    fn cycle_behind_an_acyclic_prefix_is_extracted_exactly() {
        // 0 -> 1 -> 2 -> 3 -> 1
        let adjacency = vec![vec![1], vec![2], vec![3], vec![1]];
        assert_eq!(find_cycle(&adjacency), Some(vec![1, 2, 3, 1]));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let n = 200_000;
        let mut adjacency: Vec<Vec<usize>> = (0..n).map(|i| vec![i + 1]).collect();
        adjacency.push(vec![]);
        assert_eq!(find_cycle(&adjacency), None);

        adjacency[n] = vec![0];
        let cycle = find_cycle(&adjacency).unwrap();
        assert_eq!(cycle.len(), n + 2);
    }
}
