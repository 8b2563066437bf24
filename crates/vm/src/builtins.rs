//! Native functions available to every program.

use phpi_common::{FunctionTable, NativeError, NativeFn, Variant};

/// Names and entry points of the builtins, in registration order.
pub const BUILTINS: [(&str, NativeFn); 4] = [
    ("gettype", gettype),
    ("strlen", strlen),
    ("intval", intval),
    ("strval", strval),
];

/// Appends every builtin to `table`.
///
/// Lookup is first-match, so a user function registered earlier under the
/// same name shadows the builtin.
pub fn register_builtins(table: &mut FunctionTable) {
    for (name, f) in BUILTINS {
        table.register_native(name, f);
    }
}

fn single(args: &[Variant]) -> Result<&Variant, NativeError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(NativeError::Arity {
            expected: 1,
            given: args.len(),
        }),
    }
}

/// `gettype($v)`: the type name as a string.
pub fn gettype(args: &[Variant]) -> Result<Variant, NativeError> {
    Ok(Variant::from(single(args)?.type_name()))
}

/// `strlen($s)`: byte length of the string form of a scalar.
pub fn strlen(args: &[Variant]) -> Result<Variant, NativeError> {
    let arg = single(args)?;
    if let Variant::Function(_) | Variant::Native(_) = arg {
        return Err(NativeError::Argument {
            index: 0,
            expected: "string",
            found: arg.type_name(),
        });
    }
    Ok(Variant::Long(arg.to_string().len() as i64))
}

/// `intval($v)`: integer coercion.
pub fn intval(args: &[Variant]) -> Result<Variant, NativeError> {
    Ok(Variant::Long(single(args)?.to_long()))
}

/// `strval($v)`: string coercion.
pub fn strval(args: &[Variant]) -> Result<Variant, NativeError> {
    Ok(Variant::String(single(args)?.to_string()))
}
