//! Diagnostic codes for categorizing compiler errors and warnings.
//!
//! This module provides the [`DiagnosticCode`] type for uniquely identifying
//! diagnostic messages, enabling users to look up documentation and suppress
//! specific warnings.
//!
//! # Examples
//!
//! ```
//! use coral_util::diagnostic::DiagnosticCode;
//!
//! let code = DiagnosticCode::E0001;
//! assert_eq!(code.prefix(), "E");
//! assert_eq!(code.number(), 1);
//! assert_eq!(code.as_str(), "E0001");
//! ```

/// A unique code identifying a diagnostic message
///
/// Diagnostic codes follow the format `{prefix}{number}` where:
/// - `prefix` is typically "E" for errors or "W" for warnings
/// - `number` is a 4-digit number (padded with zeros)
///
/// This allows users to reference specific diagnostics in documentation
/// and suppression attributes.
///
/// # Examples
///
/// ```
/// use coral_util::diagnostic::DiagnosticCode;
///
/// let code = DiagnosticCode::new("E", 1);
/// assert_eq!(code.as_str(), "E0001");
///
/// let warning = DiagnosticCode::W0001;
/// assert_eq!(warning.prefix(), "W");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    /// The prefix (e.g., "E" for error, "W" for warning)
    pub prefix: &'static str,
    /// The numeric identifier
    pub number: u32,
}

impl DiagnosticCode {
    /// Create a new diagnostic code
    ///
    /// # Arguments
    ///
    /// * `prefix` - The code prefix (typically "E" or "W")
    /// * `number` - The numeric identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use coral_util::diagnostic::DiagnosticCode;
    ///
    /// let code = DiagnosticCode::new("E", 1001);
    /// assert_eq!(code.prefix(), "E");
    /// assert_eq!(code.number(), 1001);
    /// ```
    #[inline]
    pub const fn new(prefix: &'static str, number: u32) -> Self {
        Self { prefix, number }
    }

    /// Get the prefix (e.g., "E" for error, "W" for warning)
    ///
    /// # Examples
    ///
    /// ```
    /// use coral_util::diagnostic::DiagnosticCode;
    ///
    /// assert_eq!(DiagnosticCode::E0001.prefix(), "E");
    /// assert_eq!(DiagnosticCode::W0001.prefix(), "W");
    /// ```
    #[inline]
    pub const fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Get the numeric identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use coral_util::diagnostic::DiagnosticCode;
    ///
    /// assert_eq!(DiagnosticCode::E0001.number(), 1);
    /// assert_eq!(DiagnosticCode::W0001.number(), 1);
    /// ```
    #[inline]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Get the full code string (e.g., "E0001", "W0001")
    ///
    /// # Examples
    ///
    /// ```
    /// use coral_util::diagnostic::DiagnosticCode;
    ///
    /// assert_eq!(DiagnosticCode::E0001.as_str(), "E0001");
    /// assert_eq!(DiagnosticCode::W0001.as_str(), "W0001");
    /// ```
    pub fn as_str(&self) -> String {
        format!("{}{:04}", self.prefix, self.number)
    }

    // =========================================================================
    // PREDEFINED ERROR CODES (E0001-E9999)
    // =========================================================================

    /// E0001: Generic compilation failure
    pub const E0001: Self = Self::new("E", 1);

    // -- identifier errors (1xxx) --------------------------------------------
    /// E1001: Reference to an identifier with no declaration in scope
    pub const E_IDENT_UNDEFINED: Self = Self::new("E", 1001);
    /// E1002: Re-declaration of an identifier already bound in the same scope
    pub const E_IDENT_REDECLARED: Self = Self::new("E", 1002);
    /// E1003: A let binding's value refers to its own not-yet-declared name
    pub const E_IDENT_SELF_REFERENTIAL: Self = Self::new("E", 1003);
    /// E1004: `_` was referenced as if it were a bound name
    pub const E_IDENT_UNDERSCORE_REF: Self = Self::new("E", 1004);

    // -- static type errors (2xxx) -------------------------------------------
    /// E2001: Operand types are statically proven incompatible for the operator
    pub const E_TYPE_INCOMPATIBLE_OPERANDS: Self = Self::new("E", 2001);
    /// E2002: A conditional's condition is statically not Boolean
    pub const E_TYPE_NON_BOOLEAN_COND: Self = Self::new("E", 2002);
    /// E2003: `first`/`second` applied to a statically non-Tuple operand
    pub const E_TYPE_NON_TUPLE_OPERAND: Self = Self::new("E", 2003);
    /// E2004: A function's declared/inferred return type mismatches its body
    pub const E_TYPE_RETURN_MISMATCH: Self = Self::new("E", 2004);

    // -- dynamic type errors (3xxx), raised at runtime by injected checks ----
    /// E3001: A runtime TypeCheck node observed a value of the wrong kind
    pub const E_DYN_TYPE_CHECK_FAILED: Self = Self::new("E", 3001);
    /// E3002: A runtime binary-operator helper observed operands of the wrong kind
    pub const E_DYN_OPERATOR_KIND_MISMATCH: Self = Self::new("E", 3002);

    // -- IR verification errors (4xxx), surfaced only under --verify-llvm ---
    /// E4001: The LLVM IR verifier rejected the generated module
    pub const E_IR_VERIFY_FAILED: Self = Self::new("E", 4001);

    // -- codegen invariant errors (5xxx), indicate a compiler bug ------------
    /// E5001: A code generator invariant was violated
    pub const E_CODEGEN_INVARIANT: Self = Self::new("E", 5001);
    /// E5002: The type inference fixed point failed to converge within budget
    pub const E_CODEGEN_FIXEDPOINT_DIVERGED: Self = Self::new("E", 5002);

    // =========================================================================
    // PREDEFINED WARNING CODES (W0001-W9999)
    // =========================================================================

    /// W0001: Unused let binding
    pub const W0001: Self = Self::new("W", 1);
    /// W1001: A let binding's value is never observed (legacy alias)
    pub const W_UNUSED_BINDING: Self = Self::new("W", 1001);
}

impl std::fmt::Debug for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DiagnosticCode({})", self.as_str())
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Standalone constant exports for convenience
pub const E0001: DiagnosticCode = DiagnosticCode::E0001;
pub const E_IDENT_UNDEFINED: DiagnosticCode = DiagnosticCode::E_IDENT_UNDEFINED;
pub const E_IDENT_REDECLARED: DiagnosticCode = DiagnosticCode::E_IDENT_REDECLARED;
pub const E_IDENT_SELF_REFERENTIAL: DiagnosticCode = DiagnosticCode::E_IDENT_SELF_REFERENTIAL;
pub const E_IDENT_UNDERSCORE_REF: DiagnosticCode = DiagnosticCode::E_IDENT_UNDERSCORE_REF;
pub const E_TYPE_INCOMPATIBLE_OPERANDS: DiagnosticCode = DiagnosticCode::E_TYPE_INCOMPATIBLE_OPERANDS;
pub const E_TYPE_NON_BOOLEAN_COND: DiagnosticCode = DiagnosticCode::E_TYPE_NON_BOOLEAN_COND;
pub const E_TYPE_NON_TUPLE_OPERAND: DiagnosticCode = DiagnosticCode::E_TYPE_NON_TUPLE_OPERAND;
pub const E_TYPE_RETURN_MISMATCH: DiagnosticCode = DiagnosticCode::E_TYPE_RETURN_MISMATCH;
pub const E_DYN_TYPE_CHECK_FAILED: DiagnosticCode = DiagnosticCode::E_DYN_TYPE_CHECK_FAILED;
pub const E_DYN_OPERATOR_KIND_MISMATCH: DiagnosticCode = DiagnosticCode::E_DYN_OPERATOR_KIND_MISMATCH;
pub const E_IR_VERIFY_FAILED: DiagnosticCode = DiagnosticCode::E_IR_VERIFY_FAILED;
pub const E_CODEGEN_INVARIANT: DiagnosticCode = DiagnosticCode::E_CODEGEN_INVARIANT;
pub const E_CODEGEN_FIXEDPOINT_DIVERGED: DiagnosticCode = DiagnosticCode::E_CODEGEN_FIXEDPOINT_DIVERGED;
pub const W0001: DiagnosticCode = DiagnosticCode::W0001;
pub const W_UNUSED_BINDING: DiagnosticCode = DiagnosticCode::W_UNUSED_BINDING;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_code() {
        let code = DiagnosticCode::new("E", 1001);
        assert_eq!(code.prefix(), "E");
        assert_eq!(code.number(), 1001);
    }

    #[test]
    fn test_as_str() {
        let code = DiagnosticCode::new("E", 1);
        assert_eq!(code.as_str(), "E0001");

        let code = DiagnosticCode::new("W", 1);
        assert_eq!(code.as_str(), "W0001");

        let code = DiagnosticCode::new("E", 1001);
        assert_eq!(code.as_str(), "E1001");
    }

    #[test]
    fn test_display() {
        let code = DiagnosticCode::new("E", 1001);
        assert_eq!(format!("{}", code), "E1001");
    }

    #[test]
    fn test_debug() {
        let code = DiagnosticCode::new("E", 1001);
        assert_eq!(format!("{:?}", code), "DiagnosticCode(E1001)");
    }

    #[test]
    fn test_predefined_error_codes() {
        assert_eq!(DiagnosticCode::E0001.prefix(), "E");
        assert_eq!(DiagnosticCode::E0001.number(), 1);
        assert_eq!(DiagnosticCode::E0001.as_str(), "E0001");

        assert_eq!(DiagnosticCode::E_IDENT_UNDEFINED.prefix(), "E");
        assert_eq!(DiagnosticCode::E_IDENT_UNDEFINED.number(), 1001);
    }

    #[test]
    fn test_predefined_warning_codes() {
        assert_eq!(DiagnosticCode::W0001.prefix(), "W");
        assert_eq!(DiagnosticCode::W0001.number(), 1);
        assert_eq!(DiagnosticCode::W0001.as_str(), "W0001");
    }

    #[test]
    fn test_taxonomy_codes() {
        assert_eq!(DiagnosticCode::W_UNUSED_BINDING.prefix(), "W");
        assert_eq!(DiagnosticCode::W_UNUSED_BINDING.number(), 1001);

        assert_eq!(DiagnosticCode::E_CODEGEN_INVARIANT.prefix(), "E");
        assert_eq!(DiagnosticCode::E_CODEGEN_INVARIANT.number(), 5001);
    }

    #[test]
    fn test_code_equality() {
        let code1 = DiagnosticCode::new("E", 1001);
        let code2 = DiagnosticCode::new("E", 1001);
        let code3 = DiagnosticCode::new("E", 1002);

        assert_eq!(code1, code2);
        assert_ne!(code1, code3);
    }

    #[test]
    fn test_const_codes() {
        // Verify const codes work correctly
        const CODE: DiagnosticCode = DiagnosticCode::E0001;
        assert_eq!(CODE.prefix(), "E");
        assert_eq!(CODE.number(), 1);
    }
}
