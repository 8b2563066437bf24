//! phpi optimizer: peephole rewriting of compiled function bodies.
//!
//! Rewrites never change the width of the bytes they touch; removed
//! instructions become NOP padding. Passes run repeatedly until none
//! applies, then an optional compaction strips the padding and fixes up
//! jump addresses.
//!
//! # Usage
//!
//! ```
//! use phpi_common::{Function, Instruction, Opcode, Operand};
//! use phpi_optimizer::{optimize_function, OptimizerConfig};
//!
//! let mut f = Function::new("f", 1);
//! f.emit(Instruction::new(Opcode::Long, Operand::Long(7)), 1);
//! f.emit(Instruction::new(Opcode::Long, Operand::Long(0)), 1);
//! f.emit(Instruction::simple(Opcode::Add), 1);
//! f.emit(Instruction::simple(Opcode::Echo), 1);
//!
//! let report = optimize_function(&mut f, &OptimizerConfig::default()).unwrap();
//! assert_eq!(report.additive_identity, 1);
//! assert_eq!(f.len(), 10);
//! ```
//!
//! # Passes
//!
//! 1. **Constant branch**: literal conditions feeding `JMPZ`
//! 2. **Self-assignment**: `LOOKUP x; ASSIGN x`
//! 3. **Additive identity**: `x + 0` and `0 + x`
//! 4. **Redundant cast**: casts to a type already known
//! 5. **Unreachable block**: dead blocks become padding

pub mod blocks;
pub mod compact;
pub mod config;
pub mod decode;
pub mod error;
pub mod peephole;
pub mod reachability;
pub mod stack;
pub mod verify;

pub use config::{OptimizeReport, OptimizerConfig, Pass, ALL_PASSES};
pub use error::OptimizeError;
pub use verify::verify_function;

use phpi_common::{Function, Program};
use tracing::{debug, trace};

use peephole::{Analysis, Edit};

/// Optimizes a single function body in place.
///
/// The result is checked with [`verify_function`]; the first violation is
/// returned as the error.
pub fn optimize_function(
    function: &mut Function,
    config: &OptimizerConfig,
) -> Result<OptimizeReport, OptimizeError> {
    let mut report = OptimizeReport {
        bytes_before: function.len(),
        ..OptimizeReport::default()
    };

    while let Some((pass, edits)) = next_rewrite(function, config)? {
        trace!(function = %function.name, %pass, edits = edits.len(), "rewrite");
        peephole::apply(&mut function.code, &edits);
        report.record(pass);
    }

    if config.compaction {
        compact::compact(function)?;
    }
    report.bytes_after = function.len();

    verify_function(function).map_err(|mut errors| errors.swap_remove(0))?;

    debug!(
        function = %function.name,
        rewrites = report.total_rewrites(),
        bytes_before = report.bytes_before,
        bytes_after = report.bytes_after,
        "optimized"
    );
    Ok(report)
}

/// Optimizes the pseudo-main and every compiled function.
pub fn optimize_program(
    program: &mut Program,
    config: &OptimizerConfig,
) -> Result<OptimizeReport, OptimizeError> {
    let mut total = OptimizeReport::default();
    for function in program.bodies_mut() {
        total.merge(&optimize_function(function, config)?);
    }
    Ok(total)
}

/// Checks every body in `program`.
pub fn verify_program(program: &Program) -> Result<(), Vec<OptimizeError>> {
    let errors: Vec<OptimizeError> = program
        .bodies()
        .filter_map(|f| verify_function(f).err())
        .flatten()
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn next_rewrite(
    function: &Function,
    config: &OptimizerConfig,
) -> Result<Option<(Pass, Vec<Edit>)>, OptimizeError> {
    let analysis = Analysis::new(function)?;
    Ok(ALL_PASSES
        .iter()
        .copied()
        .filter(|&pass| config.enabled(pass))
        .find_map(|pass| peephole::find(pass, &analysis).map(|edits| (pass, edits))))
}
