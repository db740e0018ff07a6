use log::debug;
use roxmltree::{Document, Node};

use crate::table::{is_reserved, RenameTable};

/// Counters gathered while building a [`RenameTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Cell elements visited, with or without an `id`.
    pub cells: usize,
    /// Cells whose non-reserved `id` was already assigned by an earlier cell.
    pub duplicate_ids: usize,
}

pub(crate) fn is_cell(node: Node<'_, '_>, cell_tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == cell_tag
}

/// Walk every cell of `doc` in document order and assign sequential identifiers to each distinct,
/// non-reserved `id`.
pub fn collect_ids(
    doc: &Document<'_>,
    cell_tag: &str,
    first_id: u64,
) -> (RenameTable, CollectStats) {
    let mut table = RenameTable::new(first_id);
    let mut stats = CollectStats::default();

    for cell in doc.descendants().filter(|n| is_cell(*n, cell_tag)) {
        stats.cells += 1;
        let Some(id) = cell.attribute("id") else {
            continue;
        };
        if is_reserved(id) {
            continue;
        }
        if table.contains(id) {
            stats.duplicate_ids += 1;
            debug!("duplicate cell id {id:?} shares its first mapping");
            continue;
        }
        table.assign(id);
    }

    (table, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(xml: &str) -> (Vec<(String, String)>, CollectStats) {
        let doc = Document::parse(xml).expect("parse");
        let (table, stats) = collect_ids(&doc, "mxCell", 2);
        let pairs = table
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        (pairs, stats)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn assigns_in_document_order_and_skips_reserved() {
        let (table, stats) = collect(
            r#"<mxGraphModel><root>
                <mxCell id="0"/>
                <mxCell id="1" parent="0"/>
                <mxCell id="a5" parent="1"/>
                <mxCell id="b7" parent="a5"/>
                <mxCell id="c2" source="a5" target="zzz"/>
            </root></mxGraphModel>"#,
        );
        assert_eq!(table, pairs(&[("a5", "2"), ("b7", "3"), ("c2", "4")]));
        assert_eq!(stats.cells, 5);
        assert_eq!(stats.duplicate_ids, 0);
    }

    #[test]
    fn nested_cells_follow_preorder() {
        let (table, _) = collect(
            r#"<root>
                <mxCell id="outer"><mxGeometry><mxCell id="inner"/></mxGeometry></mxCell>
                <mxCell id="after"/>
            </root>"#,
        );
        assert_eq!(
            table,
            pairs(&[("outer", "2"), ("inner", "3"), ("after", "4")])
        );
    }

    #[test]
    fn duplicates_and_missing_ids() {
        let (table, stats) = collect(
            r#"<root><mxCell id="x"/><mxCell/><mxCell id="y"/><mxCell id="x"/></root>"#,
        );
        assert_eq!(table, pairs(&[("x", "2"), ("y", "3")]));
        assert_eq!(stats.cells, 4);
        assert_eq!(stats.duplicate_ids, 1);
    }

    #[test]
    fn ignores_ids_on_other_elements() {
        let (table, stats) =
            collect(r#"<root><object id="obj"><mxCell id="c"/></object></root>"#);
        assert_eq!(table, pairs(&[("c", "2")]));
        assert_eq!(stats.cells, 1);
    }

    #[test]
    fn unescapes_ids_before_assignment() {
        let (table, _) = collect(r#"<root><mxCell id="a&amp;b"/></root>"#);
        assert_eq!(table, pairs(&[("a&b", "2")]));
    }
}
