//! Detaching nested content before creation
//!
//! Descriptors carry nested children inline, but children can only be
//! created under a parent that already has an ID. [`detach`] splits a
//! descriptor list into the flat descriptors sent in one creation call and a
//! [`Fill`] per descriptor holding what to push once IDs exist.
//!
//! Image paths are owned by position: a descriptor subtree owns as many
//! consecutive paths as it holds image descriptors in preorder.

use crate::model::BlockDescriptor;
use crate::schema::BlockType;

/// Content to create under a block after the block itself exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fill {
    None,

    /// Children of an ordinary block, created under its ID
    Children(Vec<BlockDescriptor>),

    /// Content per table cell in row-major order, created under cell IDs
    Cells(Vec<Vec<BlockDescriptor>>),
}

/// Flat descriptors and their fills, aligned by position
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub blocks: Vec<BlockDescriptor>,
    pub fills: Vec<Fill>,

    /// Image descriptors under each descriptor before detaching
    ///
    /// For a truncated table this includes images of the dropped cells.
    pub fill_images: Vec<usize>,
}

impl Plan {
    /// Image descriptors in the whole plan
    pub fn image_count(&self) -> usize {
        self.blocks.iter().filter(|b| is_image(b)).count() + self.fill_images.iter().sum::<usize>()
    }
}

fn is_image(descriptor: &BlockDescriptor) -> bool {
    descriptor.block_type == BlockType::Image
}

/// Image descriptors in a subtree, the root included
pub(crate) fn image_count(descriptor: &BlockDescriptor) -> usize {
    usize::from(is_image(descriptor)) + descriptor.children.iter().map(image_count).sum::<usize>()
}

/// Split descriptors into creatable flat blocks and deferred content
///
/// Tables keep exactly `row_size * column_size` empty cell descriptors; the
/// cell contents are padded with empty cells or truncated to match.
pub(crate) fn detach(descriptors: Vec<BlockDescriptor>) -> Plan {
    let mut plan = Plan::default();
    for descriptor in descriptors {
        let nested: usize = descriptor.children.iter().map(image_count).sum();
        let (block, fill, nested) = match descriptor.table_property() {
            Some(property) => {
                let expected = property.row_size * property.column_size;
                let mut cells: Vec<Vec<BlockDescriptor>> = descriptor
                    .children
                    .iter()
                    .map(|cell| cell.children.clone())
                    .collect();
                if cells.len() != expected {
                    log::warn!(
                        "Table {}x{} has {} cells; adjusting to {}",
                        property.row_size,
                        property.column_size,
                        cells.len(),
                        expected
                    );
                    cells.resize_with(expected, Vec::new);
                }
                let empty_cells = vec![BlockDescriptor::table_cell(Vec::new()); expected];
                let block = descriptor.without_children().with_children(empty_cells);
                (block, Fill::Cells(cells), nested)
            }
            None if descriptor.children.is_empty() => (descriptor, Fill::None, 0),
            None => {
                let block = descriptor.without_children();
                (block, Fill::Children(descriptor.children), nested)
            }
        };
        plan.blocks.push(block);
        plan.fills.push(fill);
        plan.fill_images.push(nested);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextElement;

    fn text(s: &str) -> BlockDescriptor {
        BlockDescriptor::text(vec![TextElement::text(s)])
    }

    #[test]
    fn test_leaf_blocks_have_no_fill() {
        let plan = detach(vec![text("a"), BlockDescriptor::divider()]);

        assert_eq!(plan.blocks.len(), 2);
        assert!(plan.fills.iter().all(|f| *f == Fill::None));
    }

    #[test]
    fn test_nested_children_are_detached() {
        // Arrange
        let item = BlockDescriptor::bullet(vec![TextElement::text("item")])
            .with_children(vec![text("nested")]);

        // Act
        let plan = detach(vec![item]);

        // Assert
        assert!(plan.blocks[0].children.is_empty());
        assert_eq!(plan.fills[0], Fill::Children(vec![text("nested")]));
    }

    #[test]
    fn test_table_cells_are_padded() {
        // Arrange
        let cells = vec![
            BlockDescriptor::table_cell(vec![text("a")]),
            BlockDescriptor::table_cell(vec![text("b")]),
            BlockDescriptor::table_cell(vec![text("c")]),
        ];
        let table = BlockDescriptor::table(2, 2, cells);

        // Act
        let plan = detach(vec![table]);

        // Assert
        let block = &plan.blocks[0];
        assert_eq!(block.children.len(), 4);
        assert!(block.children.iter().all(|c| c.children.is_empty()));
        let Fill::Cells(cells) = &plan.fills[0] else {
            panic!("expected cell fill");
        };
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[2], vec![text("c")]);
        assert!(cells[3].is_empty());
    }

    #[test]
    fn test_table_cells_are_truncated() {
        let cells = (0..5)
            .map(|i| BlockDescriptor::table_cell(vec![text(&i.to_string())]))
            .collect();

        let plan = detach(vec![BlockDescriptor::table(1, 2, cells)]);

        let Fill::Cells(cells) = &plan.fills[0] else {
            panic!("expected cell fill");
        };
        assert_eq!(cells.len(), 2);
        assert_eq!(plan.blocks[0].children.len(), 2);
    }

    #[test]
    fn test_image_ownership_is_counted_per_fill() {
        // Arrange
        let item = BlockDescriptor::bullet(vec![TextElement::text("item")]).with_children(vec![
            BlockDescriptor::image_placeholder(),
            text("nested"),
            BlockDescriptor::image_placeholder(),
        ]);
        let table = BlockDescriptor::table(
            1,
            1,
            vec![BlockDescriptor::table_cell(vec![
                BlockDescriptor::image_placeholder(),
            ])],
        );

        // Act
        let plan = detach(vec![BlockDescriptor::image_placeholder(), item, table]);

        // Assert
        assert_eq!(plan.fill_images, vec![0, 2, 1]);
        assert_eq!(plan.image_count(), 4);
    }

    #[test]
    fn test_truncated_table_keeps_image_ownership() {
        let cells = vec![
            BlockDescriptor::table_cell(vec![text("a")]),
            BlockDescriptor::table_cell(vec![BlockDescriptor::image_placeholder()]),
        ];

        let plan = detach(vec![BlockDescriptor::table(1, 1, cells)]);

        assert_eq!(plan.fill_images, vec![1]);
        assert_eq!(plan.fills[0], Fill::Cells(vec![vec![text("a")]]));
    }
}
