//! Typed AST node model.
//!
//! Nodes form a tree: every node reachable from the root is owned by exactly
//! one parent. Identity is carried by [NodeId], handed out by the
//! per-compilation [Context](crate::context::Context); the mutation queue and
//! the consistency validator key on it. Variables, functions and struct field
//! lists live in arenas and are referenced from the tree by id, so cloning a
//! subtree aliases the same underlying records.

pub mod build;
mod ty;
mod variable;

pub use ty::*;
pub use variable::*;

use crate::context::Context;

/// Unique identity of one allocated node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Reserved id of the transient placeholder used while re-parenting a
    /// node during mutation apply. Never reachable from a finalized tree.
    pub const PLACEHOLDER: NodeId = NodeId(u64::MAX);
}

/// Source position carried from the parser; `NONE` for synthesized nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub const NONE: SourceLoc = SourceLoc { line: 0, column: 0 };
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    /// True for operators whose operand must be an assignment target
    pub fn requires_lvalue(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

/// Binary operators, including assignments and indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Sequence operator; evaluates both sides, yields the right one
    Comma,
    Add,
    Sub,
    Mul,
    Div,
    /// Integer remainder (`%`); float mod is the `Mod` builtin
    Rem,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitXor,
    BitOr,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
    /// `a[i]`
    Index,
    /// Struct or interface block field access; right operand is the constant
    /// field index
    IndexStruct,
    Assign,
    /// Pairs a freshly declared symbol with its initializer inside a declaration
    Initialize,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinaryOp {
    /// True when the left operand must be an assignment target
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::Initialize
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
        )
    }

    /// The plain operator a compound assignment abbreviates
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Componentwise arithmetic operators subject to scalar broadcast rules
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

/// Builtin functions known to the operator tables.
///
/// This is the closed set the emitters and the emulation registry enumerate;
/// additions must extend the per-target tables as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOp {
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Mod,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    Reflect,
    Refract,
    FaceForward,
    MatrixCompMult,
    Transpose,
    Inverse,
    Determinant,
    Any,
    All,
    Not,
    DFdx,
    DFdy,
    Fwidth,
    IsNan,
    IsInf,
    FloatBitsToInt,
    IntBitsToFloat,
    Texture,
    TextureLod,
    TextureOffset,
    TextureGrad,
    TexelFetch,
}

impl BuiltinOp {
    /// Source-language spelling, used in diagnostics
    pub fn glsl_name(self) -> &'static str {
        match self {
            BuiltinOp::Radians => "radians",
            BuiltinOp::Degrees => "degrees",
            BuiltinOp::Sin => "sin",
            BuiltinOp::Cos => "cos",
            BuiltinOp::Tan => "tan",
            BuiltinOp::Asin => "asin",
            BuiltinOp::Acos => "acos",
            BuiltinOp::Atan => "atan",
            BuiltinOp::Pow => "pow",
            BuiltinOp::Exp => "exp",
            BuiltinOp::Log => "log",
            BuiltinOp::Exp2 => "exp2",
            BuiltinOp::Log2 => "log2",
            BuiltinOp::Sqrt => "sqrt",
            BuiltinOp::InverseSqrt => "inversesqrt",
            BuiltinOp::Abs => "abs",
            BuiltinOp::Sign => "sign",
            BuiltinOp::Floor => "floor",
            BuiltinOp::Ceil => "ceil",
            BuiltinOp::Fract => "fract",
            BuiltinOp::Mod => "mod",
            BuiltinOp::Min => "min",
            BuiltinOp::Max => "max",
            BuiltinOp::Clamp => "clamp",
            BuiltinOp::Mix => "mix",
            BuiltinOp::Step => "step",
            BuiltinOp::SmoothStep => "smoothstep",
            BuiltinOp::Length => "length",
            BuiltinOp::Distance => "distance",
            BuiltinOp::Dot => "dot",
            BuiltinOp::Cross => "cross",
            BuiltinOp::Normalize => "normalize",
            BuiltinOp::Reflect => "reflect",
            BuiltinOp::Refract => "refract",
            BuiltinOp::FaceForward => "faceforward",
            BuiltinOp::MatrixCompMult => "matrixCompMult",
            BuiltinOp::Transpose => "transpose",
            BuiltinOp::Inverse => "inverse",
            BuiltinOp::Determinant => "determinant",
            BuiltinOp::Any => "any",
            BuiltinOp::All => "all",
            BuiltinOp::Not => "not",
            BuiltinOp::DFdx => "dFdx",
            BuiltinOp::DFdy => "dFdy",
            BuiltinOp::Fwidth => "fwidth",
            BuiltinOp::IsNan => "isnan",
            BuiltinOp::IsInf => "isinf",
            BuiltinOp::FloatBitsToInt => "floatBitsToInt",
            BuiltinOp::IntBitsToFloat => "intBitsToFloat",
            BuiltinOp::Texture => "texture",
            BuiltinOp::TextureLod => "textureLod",
            BuiltinOp::TextureOffset => "textureOffset",
            BuiltinOp::TextureGrad => "textureGrad",
            BuiltinOp::TexelFetch => "texelFetch",
        }
    }

    /// True for texture sampling/fetch builtins, which follow the fixed
    /// argument slot order of the target intrinsics
    pub fn is_texture(self) -> bool {
        matches!(
            self,
            BuiltinOp::Texture
                | BuiltinOp::TextureLod
                | BuiltinOp::TextureOffset
                | BuiltinOp::TextureGrad
                | BuiltinOp::TexelFetch
        )
    }
}

/// What a call node invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// User-defined or synthesized function
    Function(FunctionId),
    /// Builtin function routed through the operator tables
    Builtin(BuiltinOp),
    /// Type constructor; the constructed type is the node's type
    Constructor,
}

/// One scalar component of a constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
}

/// Flattened constant value; length matches the node type's component count
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantValue(pub Vec<Scalar>);

/// Loop flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
}

/// Jump statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Return,
    Break,
    Continue,
    Discard,
}

/// Payload of one AST node
#[derive(Debug)]
pub enum NodeKind {
    /// Reference to a variable record
    Symbol(VariableId),
    /// Literal constant
    Constant(ConstantValue),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Vector component selection; components index into the operand
    Swizzle {
        operand: Box<Node>,
        components: Vec<u8>,
    },
    Ternary {
        condition: Box<Node>,
        true_expr: Box<Node>,
        false_expr: Box<Node>,
    },
    Call {
        target: CallTarget,
        args: Vec<Node>,
    },
    /// One child per declared entity: a symbol, or an `Initialize` binary
    Declaration {
        declarators: Vec<Node>,
    },
    /// Statement list
    Block {
        statements: Vec<Node>,
    },
    If {
        condition: Box<Node>,
        then_block: Box<Node>,
        else_block: Option<Box<Node>>,
    },
    Loop {
        kind: LoopKind,
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        increment: Option<Box<Node>>,
        body: Box<Node>,
    },
    Branch {
        kind: BranchKind,
        operand: Option<Box<Node>>,
    },
    FunctionDefinition {
        function: FunctionId,
        body: Box<Node>,
    },
    FunctionPrototype {
        function: FunctionId,
    },
}

/// One AST node: identity, qualified type (`void` for statements), source
/// position and kind-specific payload
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub ty: Type,
    pub loc: SourceLoc,
    pub kind: NodeKind,
}

/// Outcome of a structural child replacement
#[derive(Debug, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Done,
    /// The child id is not present under this parent
    NotFound,
    /// A multi-replacement targeted a single-child slot
    SingleSlot,
}

impl Node {
    /// Transient stand-in used while a child is moved out during mutation apply
    pub fn placeholder() -> Node {
        Node {
            id: NodeId::PLACEHOLDER,
            ty: Type::void(),
            loc: SourceLoc::NONE,
            kind: NodeKind::Block {
                statements: Vec::new(),
            },
        }
    }

    /// Children in declared evaluation order
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype { .. } => {
                Vec::new()
            }
            NodeKind::Unary { operand, .. } => vec![operand],
            NodeKind::Binary { left, right, .. } => vec![left, right],
            NodeKind::Swizzle { operand, .. } => vec![operand],
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => vec![condition, true_expr, false_expr],
            NodeKind::Call { args, .. } => args.iter().collect(),
            NodeKind::Declaration { declarators } => declarators.iter().collect(),
            NodeKind::Block { statements } => statements.iter().collect(),
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let mut out: Vec<&Node> = vec![condition, then_block];
                if let Some(e) = else_block {
                    out.push(e);
                }
                out
            }
            NodeKind::Loop {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                let mut out = Vec::new();
                if let Some(i) = init {
                    out.push(&**i);
                }
                if let Some(c) = condition {
                    out.push(&**c);
                }
                out.push(&**body);
                if let Some(i) = increment {
                    out.push(&**i);
                }
                out
            }
            NodeKind::Branch { operand, .. } => operand.iter().map(|o| &**o).collect(),
            NodeKind::FunctionDefinition { body, .. } => vec![body],
        }
    }

    /// Mutable children in declared evaluation order
    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        match &mut self.kind {
            NodeKind::Symbol(_) | NodeKind::Constant(_) | NodeKind::FunctionPrototype { .. } => {
                Vec::new()
            }
            NodeKind::Unary { operand, .. } => vec![operand],
            NodeKind::Binary { left, right, .. } => vec![left, right],
            NodeKind::Swizzle { operand, .. } => vec![operand],
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => vec![condition, true_expr, false_expr],
            NodeKind::Call { args, .. } => args.iter_mut().collect(),
            NodeKind::Declaration { declarators } => declarators.iter_mut().collect(),
            NodeKind::Block { statements } => statements.iter_mut().collect(),
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let mut out: Vec<&mut Node> = vec![condition, then_block];
                if let Some(e) = else_block {
                    out.push(e);
                }
                out
            }
            NodeKind::Loop {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                let mut out = Vec::new();
                if let Some(i) = init {
                    out.push(&mut **i);
                }
                if let Some(c) = condition {
                    out.push(&mut **c);
                }
                out.push(&mut **body);
                if let Some(i) = increment {
                    out.push(&mut **i);
                }
                out
            }
            NodeKind::Branch { operand, .. } => operand.iter_mut().map(|o| &mut **o).collect(),
            NodeKind::FunctionDefinition { body, .. } => vec![body],
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(|c| c.count()).sum::<usize>()
    }

    /// Find a node by id in this subtree
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(id))
    }

    /// Find a node by id in this subtree, mutably
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children_mut().into_iter().find_map(|c| c.find_mut(id))
    }

    /// Replace the direct child `old` with `with`.
    ///
    /// Single-child slots accept exactly one replacement node; sequence slots
    /// (blocks, declarations, call arguments) accept any count, including
    /// zero, which deletes the child.
    pub fn replace_child(&mut self, old: NodeId, mut with: Vec<Node>) -> ReplaceOutcome {
        // Sequence slots first: they support true multi-replacement.
        let seq = match &mut self.kind {
            NodeKind::Call { args, .. } => Some(args),
            NodeKind::Declaration { declarators } => Some(declarators),
            NodeKind::Block { statements } => Some(statements),
            _ => None,
        };

        if let Some(seq) = seq {
            if let Some(pos) = seq.iter().position(|c| c.id == old) {
                seq.splice(pos..pos + 1, with.into_iter());
                return ReplaceOutcome::Done;
            }
            return ReplaceOutcome::NotFound;
        }

        let slot = self.child_slot_mut(old);
        match slot {
            Some(slot) => {
                if with.len() == 1 {
                    *slot = with.pop().unwrap();
                    ReplaceOutcome::Done
                } else {
                    ReplaceOutcome::SingleSlot
                }
            }
            None => ReplaceOutcome::NotFound,
        }
    }

    /// Move the direct child `old` out of the tree, leaving a placeholder
    /// that must be filled back via [replace_child](Node::replace_child)
    /// with [NodeId::PLACEHOLDER] as the old id.
    pub fn take_child(&mut self, old: NodeId) -> Option<Node> {
        let seq = match &mut self.kind {
            NodeKind::Call { args, .. } => Some(args),
            NodeKind::Declaration { declarators } => Some(declarators),
            NodeKind::Block { statements } => Some(statements),
            _ => None,
        };

        if let Some(seq) = seq {
            let pos = seq.iter().position(|c| c.id == old)?;
            return Some(std::mem::replace(&mut seq[pos], Node::placeholder()));
        }

        let slot = self.child_slot_mut(old)?;
        Some(std::mem::replace(slot, Node::placeholder()))
    }

    fn child_slot_mut(&mut self, old: NodeId) -> Option<&mut Node> {
        let boxed: Vec<&mut Box<Node>> = match &mut self.kind {
            NodeKind::Unary { operand, .. } => vec![operand],
            NodeKind::Binary { left, right, .. } => vec![left, right],
            NodeKind::Swizzle { operand, .. } => vec![operand],
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => vec![condition, true_expr, false_expr],
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let mut out = vec![condition, then_block];
                if let Some(e) = else_block {
                    out.push(e);
                }
                out
            }
            NodeKind::Loop {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                let mut out: Vec<&mut Box<Node>> = Vec::new();
                if let Some(i) = init {
                    out.push(i);
                }
                if let Some(c) = condition {
                    out.push(c);
                }
                out.push(body);
                if let Some(i) = increment {
                    out.push(i);
                }
                out
            }
            NodeKind::Branch { operand, .. } => operand.iter_mut().collect(),
            NodeKind::FunctionDefinition { body, .. } => vec![body],
            _ => Vec::new(),
        };

        for b in boxed {
            if b.id == old {
                return Some(&mut **b);
            }
        }
        None
    }

    /// Recursively clone this subtree with fresh node ids.
    ///
    /// Variable, function and struct ids are kept: the clone aliases the same
    /// underlying records as the original.
    pub fn deep_copy(&self, ctx: &mut Context) -> Node {
        let kind = match &self.kind {
            NodeKind::Symbol(var) => NodeKind::Symbol(*var),
            NodeKind::Constant(value) => NodeKind::Constant(value.clone()),
            NodeKind::Unary { op, operand } => NodeKind::Unary {
                op: *op,
                operand: Box::new(operand.deep_copy(ctx)),
            },
            NodeKind::Binary { op, left, right } => NodeKind::Binary {
                op: *op,
                left: Box::new(left.deep_copy(ctx)),
                right: Box::new(right.deep_copy(ctx)),
            },
            NodeKind::Swizzle {
                operand,
                components,
            } => NodeKind::Swizzle {
                operand: Box::new(operand.deep_copy(ctx)),
                components: components.clone(),
            },
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => NodeKind::Ternary {
                condition: Box::new(condition.deep_copy(ctx)),
                true_expr: Box::new(true_expr.deep_copy(ctx)),
                false_expr: Box::new(false_expr.deep_copy(ctx)),
            },
            NodeKind::Call { target, args } => NodeKind::Call {
                target: *target,
                args: args.iter().map(|a| a.deep_copy(ctx)).collect(),
            },
            NodeKind::Declaration { declarators } => NodeKind::Declaration {
                declarators: declarators.iter().map(|d| d.deep_copy(ctx)).collect(),
            },
            NodeKind::Block { statements } => NodeKind::Block {
                statements: statements.iter().map(|s| s.deep_copy(ctx)).collect(),
            },
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => NodeKind::If {
                condition: Box::new(condition.deep_copy(ctx)),
                then_block: Box::new(then_block.deep_copy(ctx)),
                else_block: else_block.as_ref().map(|e| Box::new(e.deep_copy(ctx))),
            },
            NodeKind::Loop {
                kind,
                init,
                condition,
                increment,
                body,
            } => NodeKind::Loop {
                kind: *kind,
                init: init.as_ref().map(|n| Box::new(n.deep_copy(ctx))),
                condition: condition.as_ref().map(|n| Box::new(n.deep_copy(ctx))),
                increment: increment.as_ref().map(|n| Box::new(n.deep_copy(ctx))),
                body: Box::new(body.deep_copy(ctx)),
            },
            NodeKind::Branch { kind, operand } => NodeKind::Branch {
                kind: *kind,
                operand: operand.as_ref().map(|n| Box::new(n.deep_copy(ctx))),
            },
            NodeKind::FunctionDefinition { function, body } => NodeKind::FunctionDefinition {
                function: *function,
                body: Box::new(body.deep_copy(ctx)),
            },
            NodeKind::FunctionPrototype { function } => NodeKind::FunctionPrototype {
                function: *function,
            },
        };

        Node {
            id: ctx.make_node_id(),
            ty: self.ty.clone(),
            loc: self.loc,
            kind,
        }
    }
}

/// Spell out swizzle component indices as source text
pub fn swizzle_name(components: &[u8]) -> String {
    components
        .iter()
        .map(|c| match c {
            0 => 'x',
            1 => 'y',
            2 => 'z',
            _ => 'w',
        })
        .collect()
}
