//! How a command's output shows up in the data reader.

use bitflags::bitflags;

bitflags! {
    /// Describes the result set (if any) a command produces.
    ///
    /// A batch keeps one mapping per command and walks them in lock-step with
    /// the reader's result sets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResultSetMapping: u8 {
        /// The command produces a row.
        const HAS_RESULT_ROW = 1;
        /// The row shares its result set with the next command.
        const NOT_LAST_IN_RESULT_SET = (1 << 1) | Self::HAS_RESULT_ROW.bits();
        /// The row is the last one in its result set.
        const LAST_IN_RESULT_SET = (1 << 2) | Self::HAS_RESULT_ROW.bits();
        /// Rows are matched to commands through a trailing position column.
        const IS_POSITIONAL = 1 << 3;
        /// Output parameter values arrive as a row in a result set of their own.
        const HAS_OUTPUT_PARAMETERS = 1 << 4;
        /// The row holds a single affected-row count and nothing to propagate.
        const ROWS_AFFECTED_ONLY = 1 << 5;
    }
}

impl ResultSetMapping {
    /// The command produces no result set.
    pub const NO_RESULTS: Self = Self::empty();

    /// True if the command produces a regular result row.
    pub fn has_result_row(self) -> bool {
        self.contains(Self::HAS_RESULT_ROW)
    }

    /// True if the command's row closes its result set.
    pub fn is_last_in_result_set(self) -> bool {
        self.contains(Self::LAST_IN_RESULT_SET)
    }

    pub fn is_positional(self) -> bool {
        self.contains(Self::IS_POSITIONAL)
    }

    pub fn has_output_parameters(self) -> bool {
        self.contains(Self::HAS_OUTPUT_PARAMETERS)
    }

    pub fn is_rows_affected_only(self) -> bool {
        self.contains(Self::ROWS_AFFECTED_ONLY)
    }

    /// True if the reader has anything to say about this command.
    pub fn expects_results(self) -> bool {
        self.has_result_row() || self.has_output_parameters()
    }

    /// Mappings for `count` commands sharing one positional result set.
    pub fn positional_group(count: usize) -> Vec<Self> {
        (0..count)
            .map(|i| {
                let place = if i + 1 == count {
                    Self::LAST_IN_RESULT_SET
                } else {
                    Self::NOT_LAST_IN_RESULT_SET
                };
                place | Self::IS_POSITIONAL
            })
            .collect()
    }
}
