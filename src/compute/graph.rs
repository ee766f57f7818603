//! Variable dependency graph for ping-pong compute.
//!
//! Each variable owns one state attribute and names the attributes it reads.
//! Every read sees the previous step's grids, so evaluation order only
//! decides dispatch order, never which values are visible.

use crate::error::ComputeError;
use crate::state::Attribute;

/// One node of the graph: the attribute it writes and the attributes it reads.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    attribute: Attribute,
    dependencies: Vec<Attribute>,
}

impl Variable {
    #[inline]
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Attributes read by this variable, in binding order.
    #[inline]
    pub fn dependencies(&self) -> &[Attribute] {
        &self.dependencies
    }
}

/// Ordered set of compute variables.
#[derive(Clone, Debug, Default)]
pub struct ComputeGraph {
    variables: Vec<Variable>,
}

impl ComputeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flocking graph: velocity first, then position, both reading
    /// `[position, velocity]`.
    pub fn flocking() -> Self {
        let mut graph = Self::new();
        graph.add_variable(Attribute::Velocity);
        graph.add_variable(Attribute::Position);
        graph.set_dependencies(Attribute::Velocity, &[Attribute::Position, Attribute::Velocity]);
        graph.set_dependencies(Attribute::Position, &[Attribute::Position, Attribute::Velocity]);
        graph
    }

    /// Register a variable. Duplicates are reported by [`validate`](Self::validate).
    pub fn add_variable(&mut self, attribute: Attribute) {
        self.variables.push(Variable {
            attribute,
            dependencies: Vec::new(),
        });
    }

    /// Replace the dependency list of every variable writing `attribute`.
    pub fn set_dependencies(&mut self, attribute: Attribute, dependencies: &[Attribute]) {
        for variable in self.variables.iter_mut().filter(|v| v.attribute == attribute) {
            variable.dependencies = dependencies.to_vec();
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Check the graph can be evaluated.
    pub fn validate(&self) -> Result<(), ComputeError> {
        for (i, variable) in self.variables.iter().enumerate() {
            if self.variables[..i].iter().any(|v| v.attribute == variable.attribute) {
                return Err(ComputeError::DuplicateVariable(variable.attribute.name().to_string()));
            }
            if variable.dependencies.is_empty() {
                return Err(ComputeError::NoDependencies(variable.attribute.name().to_string()));
            }
            for dependency in &variable.dependencies {
                if !self.variables.iter().any(|v| v.attribute == *dependency) {
                    return Err(ComputeError::UnknownDependency {
                        variable: variable.attribute.name().to_string(),
                        dependency: dependency.name().to_string(),
                    });
                }
            }
        }
        log::debug!(
            "compute graph ok: {}",
            self.variables
                .iter()
                .map(|v| v.attribute.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(())
    }

    /// Variables in dispatch order.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}
