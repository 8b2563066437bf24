//! Optimizer configuration and the per-run report.

use std::fmt;

/// A rewriting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    /// Literal conditions feeding `JMPZ`.
    ConstantBranch,
    /// `LOOKUP x; ASSIGN x`.
    SelfAssignment,
    /// `x + 0` and `0 + x`.
    AdditiveIdentity,
    /// `CAST T` of a value already of type T.
    RedundantCast,
    /// Blocks no path reaches.
    UnreachableBlock,
}

/// Passes in the order they are tried.
pub const ALL_PASSES: [Pass; 5] = [
    Pass::ConstantBranch,
    Pass::SelfAssignment,
    Pass::AdditiveIdentity,
    Pass::RedundantCast,
    Pass::UnreachableBlock,
];

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::ConstantBranch => "constant-branch",
            Pass::SelfAssignment => "self-assignment",
            Pass::AdditiveIdentity => "additive-identity",
            Pass::RedundantCast => "redundant-cast",
            Pass::UnreachableBlock => "unreachable-block",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which passes run. Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerConfig {
    pub constant_branch: bool,
    pub self_assignment: bool,
    pub additive_identity: bool,
    pub redundant_cast: bool,
    pub unreachable_blocks: bool,
    /// Strip NOP padding and fix up jump addresses after rewriting.
    pub compaction: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            constant_branch: true,
            self_assignment: true,
            additive_identity: true,
            redundant_cast: true,
            unreachable_blocks: true,
            compaction: true,
        }
    }
}

impl OptimizerConfig {
    /// A configuration with every pass switched off.
    pub fn none() -> Self {
        Self {
            constant_branch: false,
            self_assignment: false,
            additive_identity: false,
            redundant_cast: false,
            unreachable_blocks: false,
            compaction: false,
        }
    }

    pub fn enabled(&self, pass: Pass) -> bool {
        match pass {
            Pass::ConstantBranch => self.constant_branch,
            Pass::SelfAssignment => self.self_assignment,
            Pass::AdditiveIdentity => self.additive_identity,
            Pass::RedundantCast => self.redundant_cast,
            Pass::UnreachableBlock => self.unreachable_blocks,
        }
    }
}

/// What an optimizer run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub constant_branch: usize,
    pub self_assignment: usize,
    pub additive_identity: usize,
    pub redundant_cast: usize,
    pub unreachable_block: usize,
}

impl OptimizeReport {
    pub fn record(&mut self, pass: Pass) {
        *self.counter(pass) += 1;
    }

    fn counter(&mut self, pass: Pass) -> &mut usize {
        match pass {
            Pass::ConstantBranch => &mut self.constant_branch,
            Pass::SelfAssignment => &mut self.self_assignment,
            Pass::AdditiveIdentity => &mut self.additive_identity,
            Pass::RedundantCast => &mut self.redundant_cast,
            Pass::UnreachableBlock => &mut self.unreachable_block,
        }
    }

    /// Rewrites applied by one pass.
    pub fn rewrites(&self, pass: Pass) -> usize {
        match pass {
            Pass::ConstantBranch => self.constant_branch,
            Pass::SelfAssignment => self.self_assignment,
            Pass::AdditiveIdentity => self.additive_identity,
            Pass::RedundantCast => self.redundant_cast,
            Pass::UnreachableBlock => self.unreachable_block,
        }
    }

    pub fn total_rewrites(&self) -> usize {
        ALL_PASSES.iter().map(|&p| self.rewrites(p)).sum()
    }

    pub fn bytes_removed(&self) -> usize {
        self.bytes_before.saturating_sub(self.bytes_after)
    }

    /// Adds another report's counts to this one.
    pub fn merge(&mut self, other: &OptimizeReport) {
        self.bytes_before += other.bytes_before;
        self.bytes_after += other.bytes_after;
        for pass in ALL_PASSES {
            *self.counter(pass) += other.rewrites(pass);
        }
    }
}
