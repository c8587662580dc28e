//! Function lowering and static emission (spec §4.2 "Function lowering"
//! and "Static emission").

use cc_ast::{FunDecl, Program};
use cc_data::{CConst, FrontendContext, IdentifierAttrs, InitialValue, Type, TypeKind};
use cc_ident::IdentContext;
use cc_tac_ir::{Instruction, StaticConstant, StaticVariable, TacProgram, Value};

use crate::context::Lowering;

fn static_type_size(frontend: &FrontendContext, ty: &Type) -> i64 {
    match ty.kind() {
        TypeKind::Array { size, element } => size * static_type_size(frontend, element),
        TypeKind::Structure { tag, .. } => {
            frontend.lookup_struct(*tag).expect("struct type must be declared before use").size
        }
        _ => ty.scalar_size(),
    }
}

fn is_function_global(frontend: &FrontendContext, fd: &FunDecl) -> bool {
    match frontend.lookup_symbol(fd.name).map(|sym| &sym.attrs) {
        Some(IdentifierAttrs::FunAttr { is_global, .. }) => *is_global,
        _ => true,
    }
}

fn lower_function(fd: &FunDecl, frontend: &mut FrontendContext, idents: &mut IdentContext) -> cc_tac_ir::Function {
    let is_global = is_function_global(frontend, fd);
    let mut body = {
        let mut lowering = Lowering::new(idents, frontend);
        for item in fd.body.as_ref().expect("only definitions reach lowering") {
            lowering.lower_block_item(item);
        }
        lowering.take_body()
    };
    // Every function falls off the end returning 0; a `return` earlier in
    // the body makes this dead code the optimizer prunes, but `void`
    // functions (and `main` without an explicit `return`) rely on it.
    body.push(Instruction::Return(Value::Constant(CConst::Int(0))));
    cc_tac_ir::Function { name: fd.name, is_global, params: fd.params.clone(), body }
}

/// Walks the symbol table once lowering has finished, turning every
/// `StaticAttr`/`ConstantAttr` entry into top-level TAC data. Must run after
/// all functions are lowered: lowering a bare string literal mints a fresh
/// `ConstantAttr` symbol the first time it's seen, and file-scope `static`
/// locals only get their `StaticAttr` entry from semantic analysis, not
/// from lowering, so ordering relative to functions doesn't matter for
/// those — only relative to on-the-fly string interning.
fn emit_statics(frontend: &FrontendContext) -> (Vec<StaticConstant>, Vec<StaticVariable>) {
    let mut constants = Vec::new();
    let mut variables = Vec::new();
    for (name, sym) in frontend.symbol_table.iter() {
        match &sym.attrs {
            IdentifierAttrs::StaticAttr { is_global, init } => match init {
                InitialValue::Initial(inits) => {
                    variables.push(StaticVariable {
                        name: *name,
                        is_global: *is_global,
                        var_type: sym.ty.clone(),
                        inits: inits.clone(),
                    });
                }
                InitialValue::Tentative => {
                    let size = static_type_size(frontend, &sym.ty);
                    variables.push(StaticVariable {
                        name: *name,
                        is_global: *is_global,
                        var_type: sym.ty.clone(),
                        inits: vec![cc_data::StaticInit::ZeroInit(size)],
                    });
                }
                InitialValue::NoInitializer => {}
            },
            IdentifierAttrs::ConstantAttr(init) => {
                constants.push(StaticConstant { name: *name, const_type: sym.ty.clone(), init: init.clone() });
            }
            IdentifierAttrs::FunAttr { .. } | IdentifierAttrs::LocalAttr => {}
        }
    }
    (constants, variables)
}

pub fn lower_program(program: &Program, frontend: &mut FrontendContext, idents: &mut IdentContext) -> TacProgram {
    let _span = tracing::info_span!("represent_three_address_code").entered();
    let mut functions = Vec::new();
    for decl in program {
        if let cc_ast::Declaration::Fun(fd) = decl {
            if fd.body.is_some() {
                functions.push(lower_function(fd, frontend, idents));
            }
        }
    }
    let (static_constants, static_variables) = emit_statics(frontend);
    tracing::debug!(
        functions = functions.len(),
        static_variables = static_variables.len(),
        static_constants = static_constants.len(),
        "lowered translation unit to three-address code"
    );
    TacProgram { static_constants, static_variables, functions }
}
