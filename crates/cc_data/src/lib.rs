//! The shared data model: types, constants, static initializers, and the
//! symbol/struct-typedef tables that flow through semantic analysis, TAC
//! lowering, and the optimizer.

pub mod consts;
pub mod statics;
pub mod symbol;
pub mod types;

pub use consts::CConst;
pub use statics::{InitialValue, StaticInit, StaticInitBuilder};
pub use symbol::{FrontendContext, IdentifierAttrs, StructMember, StructTypedef, Symbol};
pub use types::{Type, TypeInterner, TypeKind};
