//! The closed `MSG_…` error taxonomy (spec §7) and the `Handler` that
//! batches recoverable semantic errors instead of aborting the pass on the
//! first one. Grounded on the shape of the teacher's `rustc_errors::Handler`
//! — a long-lived sink that diagnostics get pushed into — simplified to a
//! fixed, non-localized message set.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    IllegalCast,
    JointPtrMismatch,
    UndeclaredVar,
    UndeclaredFun,
    Redeclared,
    InvalidOperatorOperand,
    IncompleteType,
    StorageClassConflict,
    DuplicateLabel,
    DuplicateCase,
    DuplicateDefault,
    BreakOutOfContext,
    ContinueOutOfContext,
    CaseOutOfContext,
    DefaultOutOfContext,
    UndefinedGotoTarget,
    ArrayBoundOverflow,
    StringInitOverflow,
    InitializerMismatch,
    NumericParseFailure,
}

impl ErrorCode {
    /// The `MSG_…` code name, matching the parser's taxonomy.
    pub fn code_name(self) -> &'static str {
        use ErrorCode::*;
        match self {
            IllegalCast => "MSG_illegal_cast",
            JointPtrMismatch => "MSG_joint_ptr_mismatch",
            UndeclaredVar => "MSG_undecl_var_in_scope",
            UndeclaredFun => "MSG_undecl_fun_in_scope",
            Redeclared => "MSG_redeclared_identifier",
            InvalidOperatorOperand => "MSG_invalid_operator_operand",
            IncompleteType => "MSG_incomplete_type",
            StorageClassConflict => "MSG_storage_class_conflict",
            DuplicateLabel => "MSG_duplicate_label",
            DuplicateCase => "MSG_duplicate_case",
            DuplicateDefault => "MSG_duplicate_default",
            BreakOutOfContext => "MSG_break_out_of_context",
            ContinueOutOfContext => "MSG_continue_out_of_context",
            CaseOutOfContext => "MSG_case_out_of_context",
            DefaultOutOfContext => "MSG_default_out_of_context",
            UndefinedGotoTarget => "MSG_undef_goto_target",
            ArrayBoundOverflow => "MSG_arr_bound_overflow",
            StringInitOverflow => "MSG_string_init_overflow",
            InitializerMismatch => "MSG_initializer_mismatch",
            NumericParseFailure => "MSG_numeric_parse_failure",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code_name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message} (line {line})")]
pub struct SemanticError {
    pub code: ErrorCode,
    pub line: u32,
    pub message: String,
}

impl SemanticError {
    pub fn new(code: ErrorCode, line: u32, message: impl Into<String>) -> Self {
        SemanticError { code, line, message: message.into() }
    }
}

/// Accumulates diagnostics across a translation unit rather than bailing
/// out on the first recoverable error. The pipeline still refuses to lower
/// a translation unit that produced any error (spec §7's "first error
/// aborts the translation unit" describes this pipeline gate, not the
/// analyzer's internal batching granularity — see DESIGN.md).
#[derive(Debug, Default)]
pub struct Handler {
    errors: Vec<SemanticError>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, err: SemanticError) {
        self.errors.push(err);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SemanticError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_batches_multiple_errors() {
        let mut h = Handler::new();
        h.emit(SemanticError::new(ErrorCode::UndeclaredVar, 3, "`x` is not in scope"));
        h.emit(SemanticError::new(ErrorCode::DuplicateLabel, 9, "label `done` redefined"));
        assert!(h.has_errors());
        assert_eq!(h.errors().len(), 2);
    }

    #[test]
    fn error_display_includes_code_and_line() {
        let e = SemanticError::new(ErrorCode::IllegalCast, 12, "cannot cast struct to int");
        let text = e.to_string();
        assert!(text.contains("MSG_illegal_cast"));
        assert!(text.contains("line 12"));
    }
}
