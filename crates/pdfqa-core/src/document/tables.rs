//! Ruling-line table detection
//!
//! Tables are recovered from drawn lines, the way a reader sees a grid:
//! straight edges are snapped and joined, their crossings become corner
//! points, four connected corners make a cell, and cells sharing corners
//! make a table. Borderless tables are not detected.

use crate::geometry::{BBox, CharBox, TableBox};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    /// y for horizontal edges, x for vertical ones
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

impl Edge {
    pub fn horizontal(y: f64, x0: f64, x1: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f64, y0: f64, y1: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: y0.min(y1),
            end: y0.max(y1),
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Corner where a vertical and a horizontal edge cross
#[derive(Debug, Clone)]
struct Corner {
    x: f64,
    y: f64,
    horizontal: Vec<usize>,
    vertical: Vec<usize>,
}

fn key(x: f64, y: f64) -> (u64, u64) {
    (x.to_bits(), y.to_bits())
}

fn shares(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|i| b.contains(i))
}

/// Settings for grid detection, all in page units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableFinder {
    pub snap_tolerance: f64,
    pub join_tolerance: f64,
    pub min_edge_length: f64,
    pub intersection_tolerance: f64,
}

impl Default for TableFinder {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            min_edge_length: 3.0,
            intersection_tolerance: 3.0,
        }
    }
}

impl TableFinder {
    /// Find the tables drawn by `edges` and fill their cells from `chars`
    pub fn find(&self, edges: &[Edge], chars: &[CharBox]) -> Vec<TableBox> {
        let edges = self.merge_edges(edges);
        let corners = self.corners(&edges);
        let cells = Self::cells(&corners);

        let mut tables: Vec<TableBox> = Self::group_cells(&cells)
            .into_iter()
            .filter(|group| group.len() > 1)
            .map(|group| Self::build_table(group, chars))
            .collect();

        // top of page first, then left to right
        tables.sort_by(|a, b| {
            b.bbox
                .y1
                .total_cmp(&a.bbox.y1)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });
        tables
    }

    /// Snap nearly-equal positions together, join collinear pieces and drop
    /// anything too short to be a ruling line.
    fn merge_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        let mut merged = Vec::new();
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let mut group: Vec<Edge> = edges
                .iter()
                .filter(|e| e.orientation == orientation)
                .copied()
                .collect();
            group.sort_by(|a, b| a.position.total_cmp(&b.position));
            self.snap(&mut group);

            group.sort_by(|a, b| {
                a.position
                    .total_cmp(&b.position)
                    .then(a.start.total_cmp(&b.start))
            });
            let mut joined: Vec<Edge> = Vec::new();
            for edge in group {
                match joined.last_mut() {
                    Some(last)
                        if last.position == edge.position
                            && edge.start <= last.end + self.join_tolerance =>
                    {
                        last.end = last.end.max(edge.end);
                    }
                    _ => joined.push(edge),
                }
            }

            merged.extend(
                joined
                    .into_iter()
                    .filter(|e| e.length() >= self.min_edge_length),
            );
        }
        merged
    }

    /// Replace each run of close positions with the run's mean.
    /// `edges` must be sorted by position.
    fn snap(&self, edges: &mut [Edge]) {
        let mut start = 0;
        while start < edges.len() {
            let mut end = start + 1;
            while end < edges.len()
                && edges[end].position - edges[end - 1].position <= self.snap_tolerance
            {
                end += 1;
            }
            let run = &mut edges[start..end];
            let mean = run.iter().map(|e| e.position).sum::<f64>() / run.len() as f64;
            for edge in run.iter_mut() {
                edge.position = mean;
            }
            start = end;
        }
    }

    fn corners(&self, edges: &[Edge]) -> Vec<Corner> {
        let tol = self.intersection_tolerance;
        let mut corners: Vec<Corner> = Vec::new();
        let mut index: HashMap<(u64, u64), usize> = HashMap::new();

        for (vi, v) in edges.iter().enumerate() {
            if v.orientation != Orientation::Vertical {
                continue;
            }
            for (hi, h) in edges.iter().enumerate() {
                if h.orientation != Orientation::Horizontal {
                    continue;
                }
                let crosses = v.position >= h.start - tol
                    && v.position <= h.end + tol
                    && h.position >= v.start - tol
                    && h.position <= v.end + tol;
                if !crosses {
                    continue;
                }

                let slot = *index.entry(key(v.position, h.position)).or_insert_with(|| {
                    corners.push(Corner {
                        x: v.position,
                        y: h.position,
                        horizontal: Vec::new(),
                        vertical: Vec::new(),
                    });
                    corners.len() - 1
                });
                corners[slot].horizontal.push(hi);
                corners[slot].vertical.push(vi);
            }
        }

        corners
    }

    /// For every corner, the smallest rectangle whose four sides are drawn
    fn cells(corners: &[Corner]) -> Vec<BBox> {
        let lookup: HashMap<(u64, u64), &Corner> =
            corners.iter().map(|c| (key(c.x, c.y), c)).collect();
        let mut cells = Vec::new();

        for top_left in corners {
            let mut below: Vec<&Corner> = corners
                .iter()
                .filter(|c| c.x == top_left.x && c.y < top_left.y)
                .collect();
            below.sort_by(|a, b| b.y.total_cmp(&a.y));
            let mut right: Vec<&Corner> = corners
                .iter()
                .filter(|c| c.y == top_left.y && c.x > top_left.x)
                .collect();
            right.sort_by(|a, b| a.x.total_cmp(&b.x));

            'search: for bottom_left in &below {
                if !shares(&top_left.vertical, &bottom_left.vertical) {
                    continue;
                }
                for top_right in &right {
                    if !shares(&top_left.horizontal, &top_right.horizontal) {
                        continue;
                    }
                    let Some(bottom_right) = lookup.get(&key(top_right.x, bottom_left.y)) else {
                        continue;
                    };
                    if shares(&bottom_right.vertical, &top_right.vertical)
                        && shares(&bottom_right.horizontal, &bottom_left.horizontal)
                    {
                        cells.push(BBox::new(
                            top_left.x,
                            bottom_left.y,
                            top_right.x,
                            top_left.y,
                        ));
                        break 'search;
                    }
                }
            }
        }

        cells
    }

    /// Union-find over cells that share a corner
    fn group_cells(cells: &[BBox]) -> Vec<Vec<BBox>> {
        fn find(parent: &mut [usize], i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            let mut node = i;
            while parent[node] != root {
                let next = parent[node];
                parent[node] = root;
                node = next;
            }
            root
        }

        let mut parent: Vec<usize> = (0..cells.len()).collect();
        let mut owner: HashMap<(u64, u64), usize> = HashMap::new();

        for (i, cell) in cells.iter().enumerate() {
            let corners = [
                (cell.x0, cell.y0),
                (cell.x0, cell.y1),
                (cell.x1, cell.y0),
                (cell.x1, cell.y1),
            ];
            for (x, y) in corners {
                match owner.get(&key(x, y)) {
                    Some(&other) => {
                        let (a, b) = (find(&mut parent, i), find(&mut parent, other));
                        if a != b {
                            parent[b] = a;
                        }
                    }
                    None => {
                        owner.insert(key(x, y), i);
                    }
                }
            }
        }

        let mut groups: HashMap<usize, Vec<BBox>> = HashMap::new();
        let mut order: Vec<usize> = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            let root = find(&mut parent, i);
            groups
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push(*cell);
        }
        order
            .into_iter()
            .filter_map(|root| groups.remove(&root))
            .collect()
    }

    fn build_table(mut cells: Vec<BBox>, chars: &[CharBox]) -> TableBox {
        cells.sort_by(|a, b| b.y1.total_cmp(&a.y1).then(a.x0.total_cmp(&b.x0)));

        let bbox = cells
            .iter()
            .skip(1)
            .fold(cells[0], |acc, cell| acc.union(cell));

        // one slot per column; columns covered by a spanning cell stay `None`
        let mut columns: Vec<f64> = cells.iter().map(|c| c.x0).collect();
        columns.sort_by(f64::total_cmp);
        columns.dedup();

        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut row_top: Option<f64> = None;
        for cell in &cells {
            if row_top != Some(cell.y1) {
                rows.push(vec![None; columns.len()]);
                row_top = Some(cell.y1);
            }
            let slot = columns.iter().position(|&x| x == cell.x0);
            if let (Some(row), Some(slot)) = (rows.last_mut(), slot) {
                row[slot] = Self::cell_text(cell, chars);
            }
        }

        TableBox { bbox, cells, rows }
    }

    fn cell_text(cell: &BBox, chars: &[CharBox]) -> Option<String> {
        let mut inside: Vec<&CharBox> = chars
            .iter()
            .filter(|c| {
                let (x, y) = c.bbox.center();
                cell.contains_point(x, y)
            })
            .collect();
        // line by line from the top, left to right within a line
        inside.sort_by(|a, b| {
            b.bbox
                .y0
                .round()
                .total_cmp(&a.bbox.y0.round())
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let text: String = inside.iter().map(|c| c.text.as_str()).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
