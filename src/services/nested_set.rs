//! Nested-set (modified preorder) numbering of a sponsor tree.
//!
//! Every user gets `(tree_id, lft, rght, level)` such that the descendants of
//! a node are exactly the nodes of the same tree with `lft` inside
//! `(node.lft, node.rght)`. That turns team size into arithmetic and team
//! volume into a single range query.
//!
//! # Invariants
//!
//! - Each root starts its own tree at `lft = 1`; `tree_id` counts from 1.
//! - `rght - lft - 1 == 2 * descendant_count`.
//! - Roots and siblings are numbered in `(username, id)` order.
//! - Every input node receives exactly one position, even when the stored
//!   parent links are dangling or cyclic.

use std::collections::HashMap;

use crate::{db::DbPool, error::AppError, platform::Platform};

/// Parent link of one user as stored in the users table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NodeLink {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSetPosition {
    pub id: i64,
    pub tree_id: i32,
    pub lft: i32,
    pub rght: i32,
    pub level: i32,
}

/// Result of numbering a forest.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NestedSet {
    pub positions: Vec<NestedSetPosition>,
    /// Nodes whose parent id points at a user that does not exist.
    pub dangling: Vec<i64>,
    /// Nodes promoted to root to break a parent cycle.
    pub detached: Vec<i64>,
}

impl NestedSet {
    pub fn tree_count(&self) -> i32 {
        self.positions.iter().map(|p| p.tree_id).max().unwrap_or(0)
    }

    /// Ids whose stored `parent_id` must be cleared to match the numbering.
    pub fn promoted_roots(&self) -> Vec<i64> {
        self.dangling
            .iter()
            .chain(self.detached.iter())
            .copied()
            .collect()
    }
}

/// Number every node of the forest described by `links`.
pub fn build_nested_set(links: &[NodeLink]) -> NestedSet {
    let index: HashMap<i64, usize> = links
        .iter()
        .enumerate()
        .map(|(i, link)| (link.id, i))
        .collect();

    let sort_key = |&i: &usize| (links[i].username.as_str(), links[i].id);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); links.len()];
    let mut roots = Vec::new();
    let mut dangling = Vec::new();

    for (i, link) in links.iter().enumerate() {
        match link.parent_id {
            None => roots.push(i),
            // A self-parented row is a one-node cycle, picked up below.
            Some(parent) if parent == link.id => {}
            Some(parent) => match index.get(&parent) {
                Some(&p) => children[p].push(i),
                None => {
                    dangling.push(link.id);
                    roots.push(i);
                }
            },
        }
    }
    for list in &mut children {
        list.sort_by_key(sort_key);
    }
    roots.sort_by_key(sort_key);

    let mut visited = vec![false; links.len()];
    let mut positions = Vec::with_capacity(links.len());
    let mut tree_id = 0;

    for root in roots {
        tree_id += 1;
        number_tree(root, tree_id, &children, &mut visited, &mut positions, links);
    }

    // Anything still unvisited hangs off a cycle. Promote the smallest id of
    // each remaining component and number it as a tree of its own.
    let mut detached = Vec::new();
    let mut leftovers: Vec<usize> = (0..links.len()).filter(|&i| !visited[i]).collect();
    leftovers.sort_by_key(|&i| links[i].id);
    for i in leftovers {
        if visited[i] {
            continue;
        }
        let root = cycle_entry(i, links, &index);
        tree_id += 1;
        detached.push(links[root].id);
        number_tree(root, tree_id, &children, &mut visited, &mut positions, links);
    }

    dangling.sort_unstable();
    NestedSet {
        positions,
        dangling,
        detached,
    }
}

/// Walk parent links from `start` until a node repeats, and return the
/// smallest-id node on that cycle.
fn cycle_entry(start: usize, links: &[NodeLink], index: &HashMap<i64, usize>) -> usize {
    let mut seen = HashMap::new();
    let mut path = Vec::new();
    let mut current = start;
    loop {
        if let Some(&pos) = seen.get(&current) {
            return path[pos..]
                .iter()
                .copied()
                .min_by_key(|&i: &usize| links[i].id)
                .unwrap_or(current);
        }
        seen.insert(current, path.len());
        path.push(current);
        match links[current].parent_id.and_then(|p| index.get(&p)) {
            Some(&parent) => current = parent,
            None => return current,
        }
    }
}

/// Iterative preorder numbering of the subtree under `root`.
fn number_tree(
    root: usize,
    tree_id: i32,
    children: &[Vec<usize>],
    visited: &mut [bool],
    positions: &mut Vec<NestedSetPosition>,
    links: &[NodeLink],
) {
    // (node, slot in `positions`, next child cursor)
    let mut stack: Vec<(usize, usize, usize)> = Vec::new();
    let mut counter = 1;

    visited[root] = true;
    positions.push(NestedSetPosition {
        id: links[root].id,
        tree_id,
        lft: counter,
        rght: 0,
        level: 0,
    });
    stack.push((root, positions.len() - 1, 0));

    while let Some(&(node, slot, cursor)) = stack.last() {
        let next = children[node][cursor..]
            .iter()
            .position(|&c| !visited[c])
            .map(|offset| cursor + offset);

        match next {
            Some(child_cursor) => {
                if let Some(top) = stack.last_mut() {
                    top.2 = child_cursor + 1;
                }
                let child = children[node][child_cursor];
                let level = stack.len() as i32;
                counter += 1;
                visited[child] = true;
                positions.push(NestedSetPosition {
                    id: links[child].id,
                    tree_id,
                    lft: counter,
                    rght: 0,
                    level,
                });
                stack.push((child, positions.len() - 1, 0));
            }
            None => {
                counter += 1;
                positions[slot].rght = counter;
                stack.pop();
            }
        }
    }
}

/// Summary of a persisted rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub nodes: usize,
    pub trees: i32,
    pub dangling: usize,
    pub detached: usize,
}

const WRITE_BATCH: usize = 10_000;

/// Recompute and store nested-set columns for every user of `platform`.
///
/// Runs inside the caller's connection so an import can rebuild within its
/// own transaction.
pub async fn rebuild_tree_in(
    conn: &mut sqlx::PgConnection,
    platform: Platform,
) -> Result<RebuildReport, sqlx::Error> {
    let users = platform.users_table();

    let links: Vec<NodeLink> =
        sqlx::query_as(&format!("SELECT id, parent_id, username FROM {users}"))
            .fetch_all(&mut *conn)
            .await?;

    let set = build_nested_set(&links);

    for id in &set.dangling {
        tracing::warn!(%platform, user_id = id, "parent does not exist, treating user as root");
    }
    for id in &set.detached {
        tracing::warn!(%platform, user_id = id, "parent cycle detected, promoting user to root");
    }

    let promoted = set.promoted_roots();
    if !promoted.is_empty() {
        sqlx::query(&format!(
            "UPDATE {users} SET parent_id = NULL, updated_at = NOW() WHERE id = ANY($1)"
        ))
        .bind(&promoted)
        .execute(&mut *conn)
        .await?;
    }

    for chunk in set.positions.chunks(WRITE_BATCH) {
        let ids: Vec<i64> = chunk.iter().map(|p| p.id).collect();
        let tree_ids: Vec<i32> = chunk.iter().map(|p| p.tree_id).collect();
        let lfts: Vec<i32> = chunk.iter().map(|p| p.lft).collect();
        let rghts: Vec<i32> = chunk.iter().map(|p| p.rght).collect();
        let levels: Vec<i32> = chunk.iter().map(|p| p.level).collect();

        sqlx::query(&format!(
            r#"
            UPDATE {users} AS u
            SET tree_id = v.tree_id, lft = v.lft, rght = v.rght, level = v.level
            FROM UNNEST($1::BIGINT[], $2::INT[], $3::INT[], $4::INT[], $5::INT[])
                AS v(id, tree_id, lft, rght, level)
            WHERE u.id = v.id
            "#
        ))
        .bind(&ids)
        .bind(&tree_ids)
        .bind(&lfts)
        .bind(&rghts)
        .bind(&levels)
        .execute(&mut *conn)
        .await?;
    }

    let report = RebuildReport {
        nodes: set.positions.len(),
        trees: set.tree_count(),
        dangling: set.dangling.len(),
        detached: set.detached.len(),
    };
    tracing::info!(
        %platform,
        nodes = report.nodes,
        trees = report.trees,
        "nested set rebuilt"
    );
    Ok(report)
}

/// Rebuild in a transaction of its own.
pub async fn rebuild_tree(pool: &DbPool, platform: Platform) -> Result<RebuildReport, AppError> {
    let mut tx = pool.begin().await?;
    let report = rebuild_tree_in(&mut *tx, platform).await?;
    tx.commit().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: i64, parent_id: Option<i64>, username: &str) -> NodeLink {
        NodeLink {
            id,
            parent_id,
            username: username.to_string(),
        }
    }

    fn position(set: &NestedSet, id: i64) -> NestedSetPosition {
        *set.positions.iter().find(|p| p.id == id).unwrap()
    }

    fn descendants(set: &NestedSet, id: i64) -> Vec<i64> {
        let node = position(set, id);
        let mut ids: Vec<i64> = set
            .positions
            .iter()
            .filter(|p| p.tree_id == node.tree_id && p.lft > node.lft && p.rght < node.rght)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn numbers_a_simple_tree_in_username_order() {
        //        1 root
        //       /      \
        //   3 "alice"  2 "bob"
        //      |
        //   4 "carol"
        let links = vec![
            link(1, None, "root"),
            link(2, Some(1), "bob"),
            link(3, Some(1), "alice"),
            link(4, Some(3), "carol"),
        ];
        let set = build_nested_set(&links);

        assert_eq!(
            position(&set, 1),
            NestedSetPosition { id: 1, tree_id: 1, lft: 1, rght: 8, level: 0 }
        );
        assert_eq!(
            position(&set, 3),
            NestedSetPosition { id: 3, tree_id: 1, lft: 2, rght: 5, level: 1 }
        );
        assert_eq!(
            position(&set, 4),
            NestedSetPosition { id: 4, tree_id: 1, lft: 3, rght: 4, level: 2 }
        );
        assert_eq!(
            position(&set, 2),
            NestedSetPosition { id: 2, tree_id: 1, lft: 6, rght: 7, level: 1 }
        );
        assert!(set.dangling.is_empty());
        assert!(set.detached.is_empty());
    }

    #[test]
    fn each_root_starts_its_own_tree() {
        let links = vec![
            link(10, None, "zed"),
            link(11, None, "amy"),
            link(12, Some(10), "kid"),
        ];
        let set = build_nested_set(&links);

        assert_eq!(position(&set, 11).tree_id, 1);
        assert_eq!(position(&set, 10).tree_id, 2);
        assert_eq!(position(&set, 10).lft, 1);
        assert_eq!(position(&set, 10).rght, 4);
        assert_eq!(set.tree_count(), 2);
    }

    #[test]
    fn bounds_match_descendant_counts() {
        // Two levels of fan-out plus a chain.
        let mut links = vec![link(1, None, "r")];
        for i in 2..=6 {
            links.push(link(i, Some(1), &format!("c{i}")));
        }
        for i in 7..=16 {
            links.push(link(i, Some(2 + (i % 5)), &format!("g{i}")));
        }
        let set = build_nested_set(&links);

        for p in &set.positions {
            let expected = descendants(&set, p.id).len() as i32;
            assert_eq!((p.rght - p.lft - 1) / 2, expected, "node {}", p.id);
        }
        assert_eq!(descendants(&set, 1).len(), 15);
    }

    #[test]
    fn deep_chains_do_not_overflow() {
        let depth = 200_000;
        let mut links = vec![link(1, None, "u")];
        for i in 2..=depth {
            links.push(link(i, Some(i - 1), "u"));
        }
        let set = build_nested_set(&links);

        let root = position(&set, 1);
        assert_eq!(root.rght, 2 * depth as i32);
        let leaf = position(&set, depth);
        assert_eq!(leaf.level, depth as i32 - 1);
        assert_eq!(leaf.rght, leaf.lft + 1);
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let links = vec![link(1, None, "a"), link(2, Some(99), "b")];
        let set = build_nested_set(&links);

        assert_eq!(set.dangling, vec![2]);
        assert_eq!(position(&set, 2).level, 0);
        assert_eq!(set.positions.len(), 2);
        assert_eq!(set.promoted_roots(), vec![2]);
    }

    #[test]
    fn cycles_are_broken_at_their_smallest_id() {
        // 5 -> 6 -> 7 -> 5, with 8 hanging below 7.
        let links = vec![
            link(1, None, "root"),
            link(5, Some(7), "e"),
            link(6, Some(5), "f"),
            link(7, Some(6), "g"),
            link(8, Some(7), "h"),
        ];
        let set = build_nested_set(&links);

        assert_eq!(set.detached, vec![5]);
        assert_eq!(set.positions.len(), 5);
        let promoted = position(&set, 5);
        assert_eq!(promoted.level, 0);
        assert_eq!(descendants(&set, 5), vec![6, 7, 8]);
    }

    #[test]
    fn self_parented_node_is_detached() {
        let links = vec![link(3, Some(3), "self")];
        let set = build_nested_set(&links);

        assert_eq!(set.detached, vec![3]);
        assert_eq!(
            position(&set, 3),
            NestedSetPosition { id: 3, tree_id: 1, lft: 1, rght: 2, level: 0 }
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(build_nested_set(&[]), NestedSet::default());
    }
}
