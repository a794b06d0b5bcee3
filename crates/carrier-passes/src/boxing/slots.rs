//! Expected types of call-site slots.
//!
//! Parameter types are read from the real override target of the callee,
//! whose erased signature is what virtual dispatch honors.

use carrier_ir::{FuncRef, IrContext, OverrideCache, TypeRef};

use super::actual::passes_receiver_boxed;
use crate::errors::{BoxingError, PassResult, ReceiverKind};
use crate::inline_class::InlineClassOracle;

/// Expected type of the dispatch receiver of a call to `target`.
pub fn dispatch_receiver_slot(
    ctx: &IrContext,
    overrides: &mut OverrideCache,
    target: FuncRef,
) -> PassResult<TypeRef> {
    if ctx.func(target).dispatch_receiver.is_none() {
        return Err(BoxingError::missing_receiver(
            ctx.func(target).name,
            ReceiverKind::Dispatch,
        ));
    }
    if passes_receiver_boxed(ctx, target) {
        return Ok(ctx.builtins().any);
    }
    let real = overrides.resolve(ctx, target)?;
    let receiver = ctx
        .func(real)
        .dispatch_receiver
        .ok_or_else(|| BoxingError::missing_receiver(ctx.func(real).name, ReceiverKind::Dispatch))?;
    Ok(ctx.var(receiver).ty)
}

/// Expected type of the extension receiver of a call to `target`.
pub fn extension_receiver_slot(
    ctx: &IrContext,
    overrides: &mut OverrideCache,
    target: FuncRef,
) -> PassResult<TypeRef> {
    let real = overrides.resolve(ctx, target)?;
    let receiver = ctx.func(real).extension_receiver.ok_or_else(|| {
        BoxingError::missing_receiver(ctx.func(real).name, ReceiverKind::Extension)
    })?;
    Ok(ctx.var(receiver).ty)
}

/// Expected type of the `index`-th positional argument of a call to `target`.
pub fn value_argument_slot(
    ctx: &IrContext,
    overrides: &mut OverrideCache,
    target: FuncRef,
    index: usize,
) -> PassResult<TypeRef> {
    let real = overrides.resolve(ctx, target)?;
    let data = ctx.func(real);
    let param = data
        .params
        .get(index)
        .ok_or_else(|| BoxingError::parameter_out_of_range(data.name, index, data.params.len()))?;
    Ok(ctx.var(*param).ty)
}

/// Expected type of a vararg element of type `element_actual`.
///
/// An inline element stored into an array of references is boxed to `Any?`
/// rather than to the declared element type, so the array holds uniformly
/// boxed elements.
pub fn vararg_element_slot(
    ctx: &IrContext,
    oracle: &dyn InlineClassOracle,
    vararg_type: TypeRef,
    element_type: TypeRef,
    element_actual: TypeRef,
) -> TypeRef {
    if oracle.is_type_inlined(ctx, element_actual)
        && !oracle.is_type_inlined(ctx, element_type)
        && !ctx.is_primitive_array(vararg_type)
    {
        ctx.builtins().any_n
    } else {
        element_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoxingErrorKind;
    use crate::inline_class::ErasedInlineClasses;
    use carrier_ir::{ClassBuilder, FunctionBuilder, Location, Modality};

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.kt");
        (ctx, Location::file(path))
    }

    #[test]
    fn arguments_use_the_real_override_target() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let meters = ClassBuilder::new(loc, "Meters").inline(b.int).build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);
        let base = ClassBuilder::new(loc, "Sink").build(&mut ctx);
        let base_ty = ctx.class_type(base, false);
        let derived = ClassBuilder::new(loc, "MetersSink")
            .supertype(base_ty)
            .final_class()
            .build(&mut ctx);
        let derived_ty = ctx.class_type(derived, false);

        let put = FunctionBuilder::new(loc, "put", b.unit)
            .owner(base)
            .modality(Modality::Open)
            .dispatch_receiver(base_ty)
            .param("value", b.any_n)
            .build(&mut ctx);
        let put_meters = FunctionBuilder::new(loc, "put", b.unit)
            .owner(derived)
            .overrides(put)
            .dispatch_receiver(derived_ty)
            .param("value", meters_ty)
            .build(&mut ctx);

        let mut overrides = OverrideCache::new();
        assert_eq!(
            value_argument_slot(&ctx, &mut overrides, put_meters, 0),
            Ok(b.any_n)
        );
        assert_eq!(
            dispatch_receiver_slot(&ctx, &mut overrides, put_meters),
            Ok(base_ty)
        );

        let err = value_argument_slot(&ctx, &mut overrides, put_meters, 1).unwrap_err();
        assert!(matches!(
            err.kind(),
            BoxingErrorKind::ParameterOutOfRange {
                index: 1,
                arity: 1,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Argument 1 is out of range for `put` with 1 parameters"
        );
    }

    #[test]
    fn virtual_inline_members_take_boxed_receivers() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let shape = ClassBuilder::new(loc, "Shape").interface().build(&mut ctx);
        let shape_ty = ctx.class_type(shape, false);
        let meters = ClassBuilder::new(loc, "Meters")
            .inline(b.int)
            .supertype(shape_ty)
            .build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);

        let area = FunctionBuilder::new(loc, "area", b.int)
            .owner(shape)
            .modality(Modality::Abstract)
            .dispatch_receiver(shape_ty)
            .build(&mut ctx);
        let meters_area = FunctionBuilder::new(loc, "area", b.int)
            .owner(meters)
            .overrides(area)
            .dispatch_receiver(meters_ty)
            .build(&mut ctx);
        let double = FunctionBuilder::new(loc, "double", meters_ty)
            .owner(meters)
            .dispatch_receiver(meters_ty)
            .build(&mut ctx);

        let mut overrides = OverrideCache::new();
        assert_eq!(
            dispatch_receiver_slot(&ctx, &mut overrides, meters_area),
            Ok(b.any)
        );
        assert_eq!(
            dispatch_receiver_slot(&ctx, &mut overrides, double),
            Ok(meters_ty)
        );

        let err = extension_receiver_slot(&ctx, &mut overrides, double).unwrap_err();
        assert_eq!(
            err.kind(),
            &BoxingErrorKind::MissingReceiver {
                function: "double".into(),
                receiver: ReceiverKind::Extension,
            }
        );
    }

    #[test]
    fn vararg_elements_widen_to_nullable_any() {
        let (mut ctx, loc) = test_ctx();
        let b = *ctx.builtins();
        let meters = ClassBuilder::new(loc, "Meters").inline(b.int).build(&mut ctx);
        let meters_ty = ctx.class_type(meters, false);
        let number = ClassBuilder::new(loc, "Number").build(&mut ctx);
        let number_ty = ctx.class_type(number, false);
        let numbers = ctx.array_type(number_ty);
        let meter_array = ctx.array_type(meters_ty);
        let chars = ctx.class_type(b.char_array_class, false);
        let oracle = ErasedInlineClasses;

        assert_eq!(
            vararg_element_slot(&ctx, &oracle, numbers, number_ty, meters_ty),
            b.any_n
        );
        assert_eq!(
            vararg_element_slot(&ctx, &oracle, meter_array, meters_ty, meters_ty),
            meters_ty
        );
        assert_eq!(
            vararg_element_slot(&ctx, &oracle, chars, b.any, b.char),
            b.any
        );
        assert_eq!(
            vararg_element_slot(&ctx, &oracle, numbers, number_ty, b.string),
            number_ty
        );
    }
}
