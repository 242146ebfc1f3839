//! Properties of grid reconstruction and run splitting

use larkdoc::convert::split_run;
use larkdoc::convert_markdown;
use larkdoc::model::{MergeInfo, TextElement};
use larkdoc::render::reconstruct_grid;
use proptest::prelude::*;

const RUN_LIMIT: usize = 2000;

/// Build a valid partition of a rows x cols grid from desired spans
///
/// Each region takes its desired span, shrunk until it only covers
/// positions no earlier region covers.
fn partition(rows: usize, cols: usize, desired: &[(usize, usize)]) -> (Vec<MergeInfo>, usize) {
    let mut covered = vec![false; rows * cols];
    let mut merge_info = vec![MergeInfo::default(); rows * cols];
    let mut regions = 0;

    for row in 0..rows {
        for col in 0..cols {
            if covered[row * cols + col] {
                continue;
            }
            let (want_rows, want_cols) = desired[row * cols + col];

            let mut col_span = want_cols.clamp(1, cols - col);
            while (col..col + col_span).any(|c| covered[row * cols + c]) {
                col_span -= 1;
            }
            let mut row_span = want_rows.clamp(1, rows - row);
            while (row..row + row_span)
                .any(|r| (col..col + col_span).any(|c| covered[r * cols + c]))
            {
                row_span -= 1;
            }

            for r in row..row + row_span {
                for c in col..col + col_span {
                    covered[r * cols + c] = true;
                }
            }
            merge_info[row * cols + col] = MergeInfo::new(row_span, col_span);
            regions += 1;
        }
    }
    (merge_info, regions)
}

fn grid_case() -> impl Strategy<Value = (usize, usize, Vec<(usize, usize)>)> {
    (1usize..7, 1usize..7).prop_flat_map(|(rows, cols)| {
        (
            Just(rows),
            Just(cols),
            prop::collection::vec((1usize..4, 1usize..4), rows * cols),
        )
    })
}

proptest! {
    #[test]
    fn grid_covers_every_position_once((rows, cols, desired) in grid_case()) {
        // Arrange
        let (merge_info, regions) = partition(rows, cols, &desired);
        let cells: Vec<String> = (0..regions).map(|i| format!("cell{}", i)).collect();

        // Act
        let grid = reconstruct_grid(rows, cols, &merge_info, &cells);

        // Assert
        let mut coverage = vec![0u32; rows * cols];
        let mut contents = Vec::new();
        for (r, c, cell) in grid.origins() {
            for rr in r..r + cell.row_span {
                for cc in c..c + cell.col_span {
                    coverage[rr * cols + cc] += 1;
                }
            }
            contents.push(cell.content.clone());
        }
        prop_assert!(coverage.iter().all(|&n| n == 1));
        prop_assert_eq!(contents, cells);
    }

    #[test]
    fn split_run_respects_limit(content in "\\PC{0,5000}") {
        let chunks = split_run(&content);

        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.chars().count() <= RUN_LIMIT));
        prop_assert_eq!(chunks.concat(), content);
    }

    #[test]
    fn long_bold_runs_keep_their_style(word in "[a-z]{2001,4500}") {
        // Arrange
        let markdown = format!("**{}**", word);

        // Act
        let conversion = convert_markdown(&markdown);

        // Assert
        let elements = conversion.blocks[0].elements().unwrap();
        prop_assert!(elements.len() >= 2);
        let mut joined = String::new();
        for element in elements {
            let TextElement::TextRun(run) = element else {
                return Err(TestCaseError::fail("expected text runs"));
            };
            prop_assert!(run.content.chars().count() <= RUN_LIMIT);
            prop_assert!(run.style().bold);
            joined.push_str(&run.content);
        }
        prop_assert_eq!(joined, word);
    }

    #[test]
    fn converter_never_emits_empty_text_blocks(markdown in "[#>*\\- \\n`a-c]{0,80}") {
        fn check(blocks: &[larkdoc::model::BlockDescriptor]) -> bool {
            blocks.iter().all(|b| !b.is_visually_empty() && check(&b.children))
        }
        prop_assert!(check(&convert_markdown(&markdown).blocks));
    }
}
