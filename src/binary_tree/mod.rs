//! Hierarchical Kepler binary tree of a particle group
//!
//! The tree is built bottom-up by pairing the two closest nodes until one
//! root remains. Nodes live in an arena with children always stored before
//! their parent, so the root is the last node and a forward pass over the
//! arena visits every child before its parent.
//!
//! ```text
//!            root (n-2)
//!           /         \
//!     node k           particle
//!     /     \
//! particle  particle
//! ```

mod kepler;

pub use kepler::KeplerOrbit;

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::slowdown::SlowDown;
use crate::{Error, Result};

/// Member slot of a binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    /// Index into the particle array
    Particle(usize),
    /// Index into the node arena
    Tree(usize),
}

/// One two-body orbit of the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryNode {
    /// Left and right members
    pub members: [Member; 2],
    /// Total mass of the left member
    pub m1: f64,
    /// Total mass of the right member
    pub m2: f64,
    /// `m1 + m2`
    pub mass: f64,
    /// Center-of-mass position
    pub pos: [f64; 3],
    /// Center-of-mass velocity
    pub vel: [f64; 3],
    /// Kepler elements of the relative orbit
    pub orbit: KeplerOrbit,
    /// Slowdown state of this orbit
    pub slowdown: SlowDown,
    member_n: usize,
}

impl BinaryNode {
    /// Number of leaf particles under this node.
    #[must_use]
    pub const fn member_n(&self) -> usize {
        self.member_n
    }

    /// Whether member `i` (0 or 1) is a subtree.
    #[must_use]
    pub const fn is_member_tree(&self, i: usize) -> bool {
        matches!(self.members[i], Member::Tree(_))
    }

    /// Semi-major axis.
    #[must_use]
    pub const fn semi(&self) -> f64 {
        self.orbit.semi
    }

    /// Eccentricity.
    #[must_use]
    pub const fn ecc(&self) -> f64 {
        self.orbit.ecc
    }

    /// Orbital period.
    #[must_use]
    pub const fn period(&self) -> f64 {
        self.orbit.period
    }

    /// Apocenter distance `a (1 + e)`.
    #[must_use]
    pub fn apocenter(&self) -> f64 {
        self.orbit.semi * (1.0 + self.orbit.ecc)
    }

    /// Pericenter distance `a (1 - e)`.
    #[must_use]
    pub fn pericenter(&self) -> f64 {
        self.orbit.semi * (1.0 - self.orbit.ecc)
    }

    /// Print column titles for one node.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column_title<W: Write>(w: &mut W, width: usize) -> Result<()> {
        for title in ["m1", "m2", "semi", "ecc", "period", "r"] {
            write!(w, "{title:>width$}")?;
        }
        SlowDown::print_column_title(w, width)
    }

    /// Print one row for this node.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        let precision = width.saturating_sub(8).max(1);
        for value in [
            self.m1,
            self.m2,
            self.orbit.semi,
            self.orbit.ecc,
            self.orbit.period,
            self.orbit.r,
        ] {
            write!(w, "{value:>width$.precision$e}")?;
        }
        self.slowdown.print_column(w, width)
    }
}

/// Mass and phase-space state of a node or particle during construction
#[derive(Clone, Copy)]
struct Cluster {
    member: Member,
    mass: f64,
    pos: [f64; 3],
    vel: [f64; 3],
    n: usize,
}

impl Cluster {
    fn from_particle(index: usize, p: &Particle) -> Self {
        Self {
            member: Member::Particle(index),
            mass: p.mass,
            pos: p.pos,
            vel: p.vel,
            n: 1,
        }
    }

    fn from_node(index: usize, node: &BinaryNode) -> Self {
        Self {
            member: Member::Tree(index),
            mass: node.mass,
            pos: node.pos,
            vel: node.vel,
            n: node.member_n,
        }
    }
}

/// Arena of binary nodes; the root is the last node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryTree {
    nodes: Vec<BinaryNode>,
}

impl BinaryTree {
    /// Build the hierarchy for `particles`.
    ///
    /// Massive particles are paired by smallest separation. Zero-mass
    /// particles are attached one by one to the outermost orbit in index
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] with fewer than two particles.
    pub fn generate(particles: &[Particle], g: f64) -> Result<Self> {
        let n = particles.len();
        if n < 2 {
            return Err(Error::InvalidInput(format!(
                "binary tree needs at least 2 particles, got {n}"
            )));
        }

        let (massive, unused): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|&i| particles[i].mass > 0.0);

        let mut tree = Self {
            nodes: Vec::with_capacity(n - 1),
        };

        let (mut current, queue) = match massive.len() {
            0 => (Cluster::from_particle(0, &particles[0]), &unused[1..]),
            1 => (
                Cluster::from_particle(massive[0], &particles[massive[0]]),
                &unused[..],
            ),
            _ => {
                let mut clusters: Vec<Cluster> = massive
                    .iter()
                    .map(|&i| Cluster::from_particle(i, &particles[i]))
                    .collect();
                while clusters.len() > 1 {
                    let (i, j) = closest_pair(&clusters);
                    let right = clusters.remove(j);
                    let left = clusters.remove(i);
                    let merged = tree.push_node(left, right, g);
                    clusters.push(merged);
                }
                (clusters[0], &unused[..])
            }
        };

        for &k in queue {
            current = tree.push_node(current, Cluster::from_particle(k, &particles[k]), g);
        }

        Ok(tree)
    }

    fn push_node(&mut self, left: Cluster, right: Cluster, g: f64) -> Cluster {
        let node = make_node(&left, &right, g);
        self.nodes.push(node);
        let index = self.nodes.len() - 1;
        Cluster::from_node(index, &self.nodes[index])
    }

    /// Recompute masses, c.m. states and Kepler elements from the current
    /// particle states, keeping the structure.
    pub fn update_orbits(&mut self, particles: &[Particle], g: f64) {
        for index in 0..self.nodes.len() {
            let members = self.nodes[index].members;
            let left = self.cluster_of(members[0], particles);
            let right = self.cluster_of(members[1], particles);
            let slowdown = self.nodes[index].slowdown;
            let mut node = make_node(&left, &right, g);
            node.slowdown = slowdown;
            self.nodes[index] = node;
        }
    }

    fn cluster_of(&self, member: Member, particles: &[Particle]) -> Cluster {
        match member {
            Member::Particle(i) => Cluster::from_particle(i, &particles[i]),
            Member::Tree(i) => Cluster::from_node(i, &self.nodes[i]),
        }
    }

    /// Number of nodes (`n_particle - 1` for a generated tree).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// All nodes, children before parents.
    #[must_use]
    pub fn nodes(&self) -> &[BinaryNode] {
        &self.nodes
    }

    /// Mutable access to all nodes.
    pub fn nodes_mut(&mut self) -> &mut [BinaryNode] {
        &mut self.nodes
    }

    /// Node by arena index.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&BinaryNode> {
        self.nodes.get(index)
    }

    /// Arena index of the root.
    #[must_use]
    pub fn root_index(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> Option<&BinaryNode> {
        self.nodes.last()
    }

    /// Mutable root node.
    pub fn root_mut(&mut self) -> Option<&mut BinaryNode> {
        self.nodes.last_mut()
    }

    /// Fold over the nodes under `root()`, children first.
    pub fn process_root_iter<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &BinaryNode) -> T,
    {
        match self.root_index() {
            Some(root) => self.fold_node(root, init, &mut f),
            None => init,
        }
    }

    fn fold_node<T, F>(&self, index: usize, mut acc: T, f: &mut F) -> T
    where
        F: FnMut(T, &BinaryNode) -> T,
    {
        let node = &self.nodes[index];
        for member in node.members {
            if let Member::Tree(child) = member {
                acc = self.fold_node(child, acc, f);
            }
        }
        f(acc, node)
    }

    /// Leaf particle indices under node `index`, left to right.
    #[must_use]
    pub fn member_particle_indices(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(index, &mut out);
        out
    }

    fn collect_leaves(&self, index: usize, out: &mut Vec<usize>) {
        for member in self.nodes[index].members {
            match member {
                Member::Particle(i) => out.push(i),
                Member::Tree(child) => self.collect_leaves(child, out),
            }
        }
    }
}

fn closest_pair(clusters: &[Cluster]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut r2_min = f64::MAX;
    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            let dr = crate::vec3::sub(&clusters[j].pos, &clusters[i].pos);
            let r2 = crate::vec3::norm2(&dr);
            if r2 < r2_min {
                r2_min = r2;
                best = (i, j);
            }
        }
    }
    best
}

fn make_node(left: &Cluster, right: &Cluster, g: f64) -> BinaryNode {
    let mass = left.mass + right.mass;
    let mut pos = [0.0; 3];
    let mut vel = [0.0; 3];
    for k in 0..3 {
        if mass > 0.0 {
            pos[k] = (left.mass * left.pos[k] + right.mass * right.pos[k]) / mass;
            vel[k] = (left.mass * left.vel[k] + right.mass * right.vel[k]) / mass;
        } else {
            pos[k] = 0.5 * (left.pos[k] + right.pos[k]);
            vel[k] = 0.5 * (left.vel[k] + right.vel[k]);
        }
    }
    let dr = crate::vec3::sub(&right.pos, &left.pos);
    let dv = crate::vec3::sub(&right.vel, &left.vel);
    BinaryNode {
        members: [left.member, right.member],
        m1: left.mass,
        m2: right.mass,
        mass,
        pos,
        vel,
        orbit: KeplerOrbit::from_relative(&dr, &dv, g * mass),
        slowdown: SlowDown::default(),
        member_n: left.n + right.n,
    }
}
