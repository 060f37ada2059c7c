//! Generic tree traversal with deferred mutation.
//!
//! A pass traverses the tree read-only through a [Visitor], queues structural
//! edits on the [Traverser], and applies them afterwards with
//! [rewrite::apply]. Mutating the tree while iterating it is never allowed;
//! the queue is what makes rewrites safe.

mod rewrite;
mod validate;

pub use rewrite::{apply, run_to_fixed_point, EditList, Replacement, WrapFn};
pub use validate::{validate, ValidateOptions};

use crate::ast::{BinaryOp, CallTarget, Node, NodeId, NodeKind, Type, VariableId};
use crate::context::Context;
use crate::error::{Error, Result};

/// Position of a visit callback relative to the node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitPhase {
    /// Before any child
    Pre,
    /// Between two children
    In,
    /// After all children
    Post,
}

/// Whether to descend into the children of the visited node.
///
/// Returning [Traverse::Skip] from a Pre visit skips the children, the In
/// visits and the Post visit of that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traverse {
    Children,
    Skip,
}

/// Per-node visit callbacks.
///
/// Composite kinds receive Pre/In/Post phases; the return value is only
/// consulted for the Pre phase. Leaves receive a single call.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_symbol(&mut self, t: &mut Traverser, node: &Node) {}
    fn visit_constant(&mut self, t: &mut Traverser, node: &Node) {}
    fn visit_function_prototype(&mut self, t: &mut Traverser, node: &Node) {}

    fn visit_unary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_binary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_swizzle(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_ternary(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_call(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_declaration(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_block(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_if(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_loop(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_branch(&mut self, t: &mut Traverser, phase: VisitPhase, node: &Node) -> Traverse {
        Traverse::Children
    }
    fn visit_function_definition(
        &mut self,
        t: &mut Traverser,
        phase: VisitPhase,
        node: &Node,
    ) -> Traverse {
        Traverse::Children
    }
}

/// Statement-list position recorded for sibling insertion
#[derive(Debug, Clone, Copy)]
struct ParentBlock {
    block: NodeId,
    /// Statement currently being visited inside the block
    current: Option<NodeId>,
}

/// Traversal driver state threaded through the recursive descent.
///
/// Owns the mutation queue for the traversal and the compilation context the
/// visitor allocates new nodes from.
pub struct Traverser<'c> {
    pub ctx: &'c mut Context,
    depth: usize,
    max_depth: usize,
    in_lvalue: bool,
    in_out_parameter: bool,
    parent_blocks: Vec<ParentBlock>,
    path: Vec<NodeId>,
    current_function: Option<crate::ast::FunctionId>,
    current_temp: Option<VariableId>,
    edits: EditList,
    error: Option<Error>,
}

impl<'c> Traverser<'c> {
    pub fn new(ctx: &'c mut Context) -> Self {
        let max_depth = ctx.limits.max_depth;
        Traverser {
            ctx,
            depth: 0,
            max_depth,
            in_lvalue: false,
            in_out_parameter: false,
            parent_blocks: Vec::new(),
            path: Vec::new(),
            current_function: None,
            current_temp: None,
            edits: EditList::new(),
            error: None,
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True when the node being visited must be an assignment target
    pub fn in_lvalue(&self) -> bool {
        self.in_lvalue
    }

    /// True when the node being visited is an argument bound to an out or
    /// inout parameter
    pub fn in_out_parameter(&self) -> bool {
        self.in_out_parameter
    }

    /// Function definition enclosing the current position, if any
    pub fn current_function(&self) -> Option<crate::ast::FunctionId> {
        self.current_function
    }

    /// Statement of the nearest enclosing block currently being visited
    pub fn current_statement(&self) -> Option<NodeId> {
        self.parent_blocks.last().and_then(|pb| pb.current)
    }

    /// Nearest enclosing block of the current position
    pub fn parent_block(&self) -> Option<NodeId> {
        self.parent_blocks.last().map(|pb| pb.block)
    }

    /// Number of blocks enclosing the current position
    pub fn block_nesting(&self) -> usize {
        self.parent_blocks.len()
    }

    /// Parent of the node currently being visited
    pub fn parent(&self) -> Option<NodeId> {
        if self.path.len() >= 2 {
            Some(self.path[self.path.len() - 2])
        } else {
            None
        }
    }

    /// Record the first error; traversal unwinds without visiting further nodes
    pub fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Queue replacement of a single child
    pub fn queue_replacement(&mut self, parent: NodeId, old: NodeId, with: Node) {
        self.edits.push_replace(parent, old, Replacement::With(with));
    }

    /// Queue replacement of one child with zero or more siblings
    pub fn queue_multi_replacement(&mut self, parent: NodeId, old: NodeId, with: Vec<Node>) {
        self.edits.push_replace(parent, old, Replacement::Multi(with));
    }

    /// Queue wrapping of a child: at apply time the old node is moved out of
    /// the tree and handed to `wrap`, whose result takes its place. The old
    /// node must not be independently re-inserted.
    pub fn queue_wrap(&mut self, parent: NodeId, old: NodeId, wrap: WrapFn) {
        self.edits.push_replace(parent, old, Replacement::Wrap(wrap));
    }

    /// Queue sibling statements around the statement currently being visited
    /// in the nearest enclosing block
    pub fn insert_in_parent_block(&mut self, before: Vec<Node>, after: Vec<Node>) {
        match self.parent_blocks.last().and_then(|pb| pb.current.map(|c| (pb.block, c))) {
            Some((block, anchor)) => self.edits.push_insert(block, anchor, before, after),
            None => self.set_error(Error::Internal(
                "statement insertion requested outside of any block".to_owned(),
            )),
        }
    }

    /// Queue sibling statements around an explicit statement of a block the
    /// traversal has not necessarily entered
    pub fn insert_around(&mut self, block: NodeId, anchor: NodeId, before: Vec<Node>, after: Vec<Node>) {
        self.edits.push_insert(block, anchor, before, after);
    }

    /// Queue sibling statements around the top-level statement enclosing the
    /// current position, in the outermost block.
    ///
    /// Used for hoisting synthesized function definitions next to the
    /// definition they were extracted from.
    pub fn insert_at_top_level(&mut self, before: Vec<Node>, after: Vec<Node>) {
        match self.parent_blocks.first().and_then(|pb| pb.current.map(|c| (pb.block, c))) {
            Some((block, anchor)) => self.edits.push_insert(block, anchor, before, after),
            None => self.set_error(Error::Internal(
                "top-level insertion requested outside of the root block".to_owned(),
            )),
        }
    }

    /// Symbol node for the traversal's temporary variable.
    ///
    /// One traversal uses at most one distinct temporary name; repeated calls
    /// return symbols aliasing the same variable until
    /// [next_temporary](Traverser::next_temporary) advances the counter.
    pub fn temp_symbol(&mut self, ty: Type) -> Node {
        let var = self.temp_variable(ty);
        crate::ast::build::symbol(self.ctx, var)
    }

    /// Variable record backing [temp_symbol](Traverser::temp_symbol)
    pub fn temp_variable(&mut self, ty: Type) -> VariableId {
        match self.current_temp {
            Some(var) => var,
            None => {
                let var = self.ctx.temp_variable(ty);
                self.current_temp = Some(var);
                var
            }
        }
    }

    /// Advance the temporary counter; the next temp symbol gets a fresh name
    pub fn next_temporary(&mut self) {
        self.current_temp = None;
        self.ctx.next_temporary();
    }

    /// Check for a recorded error and hand over the queued edits
    pub fn finish(self) -> Result<EditList> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.edits),
        }
    }

    fn enter(&mut self, node: NodeId) -> bool {
        self.depth += 1;
        self.path.push(node);
        if self.depth > self.max_depth {
            self.set_error(Error::TooDeeplyNested {
                depth: self.depth,
                limit: self.max_depth,
            });
            return false;
        }
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
        self.path.pop();
    }
}

/// Traverse `node` in declared evaluation order, dispatching on kind.
///
/// Children are visited left before right for binary operators, sequence
/// order for calls and blocks, condition then branches for conditionals, and
/// init, condition, body, increment for loops.
pub fn traverse<V: Visitor>(node: &Node, visitor: &mut V, t: &mut Traverser) {
    if t.error.is_some() {
        return;
    }

    if !t.enter(node.id) {
        t.leave();
        return;
    }

    match &node.kind {
        NodeKind::Symbol(_) => visitor.visit_symbol(t, node),
        NodeKind::Constant(_) => visitor.visit_constant(t, node),
        NodeKind::FunctionPrototype { .. } => visitor.visit_function_prototype(t, node),

        NodeKind::Unary { op, operand } => {
            if visitor.visit_unary(t, VisitPhase::Pre, node) == Traverse::Children {
                let saved = t.in_lvalue;
                t.in_lvalue = op.requires_lvalue();
                traverse(operand, visitor, t);
                t.in_lvalue = saved;

                visitor.visit_unary(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Binary { op, left, right } => {
            if visitor.visit_binary(t, VisitPhase::Pre, node) == Traverse::Children {
                let saved_lvalue = t.in_lvalue;
                let saved_out = t.in_out_parameter;

                match *op {
                    op if op.is_assignment() => {
                        t.in_lvalue = true;
                        traverse(left, visitor, t);
                        visitor.visit_binary(t, VisitPhase::In, node);
                        t.in_lvalue = false;
                        t.in_out_parameter = false;
                        traverse(right, visitor, t);
                    }
                    BinaryOp::Index | BinaryOp::IndexStruct => {
                        // The indexed expression inherits the l-value
                        // requirement; the index operand never does.
                        traverse(left, visitor, t);
                        visitor.visit_binary(t, VisitPhase::In, node);
                        t.in_lvalue = false;
                        t.in_out_parameter = false;
                        traverse(right, visitor, t);
                    }
                    _ => {
                        t.in_lvalue = false;
                        t.in_out_parameter = false;
                        traverse(left, visitor, t);
                        visitor.visit_binary(t, VisitPhase::In, node);
                        traverse(right, visitor, t);
                    }
                }

                t.in_lvalue = saved_lvalue;
                t.in_out_parameter = saved_out;

                visitor.visit_binary(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Swizzle { operand, .. } => {
            if visitor.visit_swizzle(t, VisitPhase::Pre, node) == Traverse::Children {
                // The operand inherits the l-value requirement of the swizzle.
                traverse(operand, visitor, t);
                visitor.visit_swizzle(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            if visitor.visit_ternary(t, VisitPhase::Pre, node) == Traverse::Children {
                let saved_lvalue = t.in_lvalue;
                let saved_out = t.in_out_parameter;
                t.in_lvalue = false;
                t.in_out_parameter = false;

                traverse(condition, visitor, t);
                visitor.visit_ternary(t, VisitPhase::In, node);
                traverse(true_expr, visitor, t);
                visitor.visit_ternary(t, VisitPhase::In, node);
                traverse(false_expr, visitor, t);

                t.in_lvalue = saved_lvalue;
                t.in_out_parameter = saved_out;

                visitor.visit_ternary(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Call { target, args } => {
            if visitor.visit_call(t, VisitPhase::Pre, node) == Traverse::Children {
                let out_params: Vec<bool> = match target {
                    CallTarget::Function(function) => t
                        .ctx
                        .functions
                        .get(*function)
                        .parameters
                        .iter()
                        .map(|p| p.direction.is_output())
                        .collect(),
                    _ => Vec::new(),
                };

                let saved_lvalue = t.in_lvalue;
                let saved_out = t.in_out_parameter;

                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        visitor.visit_call(t, VisitPhase::In, node);
                    }

                    let is_out = out_params.get(i).copied().unwrap_or(false);
                    t.in_lvalue = is_out;
                    t.in_out_parameter = is_out;
                    traverse(arg, visitor, t);
                }

                t.in_lvalue = saved_lvalue;
                t.in_out_parameter = saved_out;

                visitor.visit_call(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Declaration { declarators } => {
            if visitor.visit_declaration(t, VisitPhase::Pre, node) == Traverse::Children {
                for (i, d) in declarators.iter().enumerate() {
                    if i > 0 {
                        visitor.visit_declaration(t, VisitPhase::In, node);
                    }
                    traverse(d, visitor, t);
                }
                visitor.visit_declaration(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Block { statements } => {
            if visitor.visit_block(t, VisitPhase::Pre, node) == Traverse::Children {
                t.parent_blocks.push(ParentBlock {
                    block: node.id,
                    current: None,
                });

                for stmt in statements {
                    if let Some(pb) = t.parent_blocks.last_mut() {
                        pb.current = Some(stmt.id);
                    }
                    traverse(stmt, visitor, t);
                }

                t.parent_blocks.pop();

                visitor.visit_block(t, VisitPhase::Post, node);
            }
        }

        NodeKind::If {
            condition,
            then_block,
            else_block,
        } => {
            if visitor.visit_if(t, VisitPhase::Pre, node) == Traverse::Children {
                traverse(condition, visitor, t);
                visitor.visit_if(t, VisitPhase::In, node);
                traverse(then_block, visitor, t);
                if let Some(else_block) = else_block {
                    visitor.visit_if(t, VisitPhase::In, node);
                    traverse(else_block, visitor, t);
                }
                visitor.visit_if(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Loop {
            init,
            condition,
            increment,
            body,
            ..
        } => {
            if visitor.visit_loop(t, VisitPhase::Pre, node) == Traverse::Children {
                if let Some(init) = init {
                    traverse(init, visitor, t);
                }
                if let Some(condition) = condition {
                    traverse(condition, visitor, t);
                }
                traverse(body, visitor, t);
                if let Some(increment) = increment {
                    traverse(increment, visitor, t);
                }
                visitor.visit_loop(t, VisitPhase::Post, node);
            }
        }

        NodeKind::Branch { operand, .. } => {
            if visitor.visit_branch(t, VisitPhase::Pre, node) == Traverse::Children {
                if let Some(operand) = operand {
                    traverse(operand, visitor, t);
                }
                visitor.visit_branch(t, VisitPhase::Post, node);
            }
        }

        NodeKind::FunctionDefinition { function, body } => {
            if visitor.visit_function_definition(t, VisitPhase::Pre, node) == Traverse::Children {
                let saved = t.current_function;
                t.current_function = Some(*function);
                traverse(body, visitor, t);
                t.current_function = saved;

                visitor.visit_function_definition(t, VisitPhase::Post, node);
            }
        }
    }

    t.leave();
}
