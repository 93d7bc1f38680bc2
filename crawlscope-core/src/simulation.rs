// Velocity-Verlet force simulation used by the network layout

use std::f64::consts::PI;

/// A simulated point mass. `fx`/`fy` pin the body while set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

impl Body {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }
}

/// Linear congruential generator; keeps every layout run reproducible.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 4_294_967_296;

    pub fn new(seed: u64) -> Self {
        Self { state: seed % Self::M }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (Self::A * self.state + Self::C) % Self::M;
        self.state as f64 / Self::M as f64
    }

    /// Tiny random offset used to separate coincident bodies.
    pub fn jiggle(&mut self) -> f64 {
        (self.next_f64() - 0.5) * 1e-6
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(1)
    }
}

/// A force contributes velocity to bodies once per tick.
pub trait Force: Send {
    fn apply(&mut self, bodies: &mut [Body], alpha: f64, rng: &mut Lcg);
}

/// Position of the `i`th body on a phyllotaxis spiral around the origin.
pub fn phyllotaxis(i: usize) -> (f64, f64) {
    let initial_angle = PI * (3.0 - 5f64.sqrt());
    let radius = 10.0 * (0.5 + i as f64).sqrt();
    let angle = i as f64 * initial_angle;
    (radius * angle.cos(), radius * angle.sin())
}

pub struct Simulation {
    bodies: Vec<Body>,
    forces: Vec<(&'static str, Box<dyn Force>)>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    rng: Lcg,
}

impl Simulation {
    pub fn new(bodies: Vec<Body>) -> Self {
        let alpha_min: f64 = 0.001;
        Self {
            bodies,
            forces: Vec::new(),
            alpha: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            rng: Lcg::default(),
        }
    }

    pub fn with_force(mut self, name: &'static str, force: impl Force + 'static) -> Self {
        self.forces.push((name, Box::new(force)));
        self
    }

    pub fn force_names(&self) -> Vec<&'static str> {
        self.forces.iter().map(|(name, _)| *name).collect()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    pub fn restart(&mut self) {
        if self.alpha < self.alpha_min {
            self.alpha = self.alpha_min.max(self.alpha_target);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.alpha_min
    }

    /// Advance one tick regardless of alpha.
    pub fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        for (_, force) in self.forces.iter_mut() {
            force.apply(&mut self.bodies, self.alpha, &mut self.rng);
        }

        let keep = 1.0 - self.velocity_decay;
        for body in self.bodies.iter_mut() {
            match body.fx {
                Some(fx) => {
                    body.x = fx;
                    body.vx = 0.0;
                }
                None => {
                    body.vx *= keep;
                    body.x += body.vx;
                }
            }
            match body.fy {
                Some(fy) => {
                    body.y = fy;
                    body.vy = 0.0;
                }
                None => {
                    body.vy *= keep;
                    body.y += body.vy;
                }
            }
        }
    }

    /// Tick once unless the simulation has cooled down. Returns whether it ticked.
    pub fn step(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.tick();
        true
    }

    /// Run until settled or `max_ticks` is reached; returns the ticks spent.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.step() {
            ticks += 1;
        }
        ticks
    }

    pub fn pin(&mut self, index: usize, x: f64, y: f64) {
        if let Some(body) = self.bodies.get_mut(index) {
            body.fx = Some(x);
            body.fy = Some(y);
        }
    }

    pub fn unpin(&mut self, index: usize) {
        if let Some(body) = self.bodies.get_mut(index) {
            body.fx = None;
            body.fy = None;
        }
    }
}

/// Spring between linked bodies, pulling them toward `distance`.
pub struct LinkForce {
    links: Vec<(usize, usize)>,
    distance: f64,
    strengths: Vec<f64>,
    biases: Vec<f64>,
}

impl LinkForce {
    pub fn new(links: Vec<(usize, usize)>, body_count: usize, distance: f64) -> Self {
        let mut counts = vec![0usize; body_count];
        for &(s, t) in &links {
            counts[s] += 1;
            counts[t] += 1;
        }
        let strengths = links
            .iter()
            .map(|&(s, t)| 1.0 / counts[s].min(counts[t]).max(1) as f64)
            .collect();
        let biases = links
            .iter()
            .map(|&(s, t)| counts[s] as f64 / (counts[s] + counts[t]) as f64)
            .collect();
        Self {
            links,
            distance,
            strengths,
            biases,
        }
    }
}

impl Force for LinkForce {
    fn apply(&mut self, bodies: &mut [Body], alpha: f64, rng: &mut Lcg) {
        for (i, &(s, t)) in self.links.iter().enumerate() {
            if s == t {
                continue;
            }
            let (source, target) = (bodies[s], bodies[t]);
            let mut x = target.x + target.vx - source.x - source.vx;
            let mut y = target.y + target.vy - source.y - source.vy;
            if x == 0.0 {
                x = rng.jiggle();
            }
            if y == 0.0 {
                y = rng.jiggle();
            }
            let mut l = (x * x + y * y).sqrt();
            l = (l - self.distance) / l * alpha * self.strengths[i];
            x *= l;
            y *= l;

            let bias = self.biases[i];
            bodies[t].vx -= x * bias;
            bodies[t].vy -= y * bias;
            bodies[s].vx += x * (1.0 - bias);
            bodies[s].vy += y * (1.0 - bias);
        }
    }
}

/// Charge between every pair of bodies; negative repels. Distant groups are
/// approximated by their centroid (Barnes-Hut) once a quad's size over its
/// distance falls below `theta`.
pub struct ManyBodyForce {
    strength: f64,
    distance_min2: f64,
    theta2: f64,
}

impl ManyBodyForce {
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            distance_min2: 1.0,
            theta2: 0.81,
        }
    }

    /// `0.0` turns off the approximation.
    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta2 = theta * theta;
        self
    }

    fn pull(&self, mut x: f64, mut y: f64, weight: f64, alpha: f64, rng: &mut Lcg) -> (f64, f64) {
        let mut l = x * x + y * y;
        if x == 0.0 {
            x = rng.jiggle();
            l += x * x;
        }
        if y == 0.0 {
            y = rng.jiggle();
            l += y * y;
        }
        if l < self.distance_min2 {
            l = (self.distance_min2 * l).sqrt();
        }
        let w = self.strength * alpha * weight / l;
        (x * w, y * w)
    }
}

impl Force for ManyBodyForce {
    fn apply(&mut self, bodies: &mut [Body], alpha: f64, rng: &mut Lcg) {
        if bodies.len() < 2 {
            return;
        }
        let tree = QuadTree::build(bodies);
        let mut stack = Vec::new();
        for i in 0..bodies.len() {
            let (xi, yi) = (bodies[i].x, bodies[i].y);
            let path = tree.path_to(tree.leaf_of[i]);
            let (mut dvx, mut dvy) = (0.0, 0.0);
            stack.clear();
            stack.push(0);
            while let Some(q) = stack.pop() {
                let quad = &tree.quads[q];
                if quad.count == 0 {
                    continue;
                }
                if !path.contains(&q) {
                    let (x, y) = (quad.cx - xi, quad.cy - yi);
                    if quad.size * quad.size / self.theta2 < x * x + y * y {
                        let (ax, ay) = self.pull(x, y, quad.count as f64, alpha, rng);
                        dvx += ax;
                        dvy += ay;
                        continue;
                    }
                }
                match quad.children {
                    Some(children) => stack.extend(children),
                    None => {
                        for &j in quad.bodies.iter().filter(|&&j| j != i) {
                            let (ax, ay) = self.pull(bodies[j].x - xi, bodies[j].y - yi, 1.0, alpha, rng);
                            dvx += ax;
                            dvy += ay;
                        }
                    }
                }
            }
            bodies[i].vx += dvx;
            bodies[i].vy += dvy;
        }
    }
}

const MAX_QUAD_DEPTH: usize = 32;

struct Quad {
    x0: f64,
    y0: f64,
    size: f64,
    parent: Option<usize>,
    children: Option<[usize; 4]>,
    bodies: Vec<usize>,
    count: usize,
    cx: f64,
    cy: f64,
}

impl Quad {
    fn new(x0: f64, y0: f64, size: f64, parent: Option<usize>) -> Self {
        Self {
            x0,
            y0,
            size,
            parent,
            children: None,
            bodies: Vec::new(),
            count: 0,
            cx: 0.0,
            cy: 0.0,
        }
    }

    fn quadrant(&self, x: f64, y: f64) -> usize {
        let half = self.size / 2.0;
        usize::from(x >= self.x0 + half) | usize::from(y >= self.y0 + half) << 1
    }
}

/// Arena quadtree; children always sit after their parent.
struct QuadTree {
    quads: Vec<Quad>,
    leaf_of: Vec<usize>,
}

impl QuadTree {
    fn build(bodies: &[Body]) -> Self {
        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for b in bodies {
            x0 = x0.min(b.x);
            y0 = y0.min(b.y);
            x1 = x1.max(b.x);
            y1 = y1.max(b.y);
        }
        let size = (x1 - x0).max(y1 - y0).max(1.0);
        let mut tree = Self {
            quads: vec![Quad::new(x0, y0, size, None)],
            leaf_of: vec![0; bodies.len()],
        };
        for i in 0..bodies.len() {
            tree.insert(bodies, i);
        }
        tree.accumulate(bodies);
        tree
    }

    fn insert(&mut self, bodies: &[Body], i: usize) {
        let (x, y) = (bodies[i].x, bodies[i].y);
        let (mut q, mut depth) = (0, 0);
        loop {
            let quad = &self.quads[q];
            if let Some(children) = quad.children {
                q = children[quad.quadrant(x, y)];
                depth += 1;
                continue;
            }
            let coincident = quad.bodies.first().is_none_or(|&j| bodies[j].x == x && bodies[j].y == y);
            if coincident || depth >= MAX_QUAD_DEPTH {
                self.quads[q].bodies.push(i);
                self.leaf_of[i] = q;
                return;
            }
            self.split(bodies, q);
        }
    }

    fn split(&mut self, bodies: &[Body], q: usize) {
        let (x0, y0, half) = (self.quads[q].x0, self.quads[q].y0, self.quads[q].size / 2.0);
        let first = self.quads.len();
        for k in 0..4 {
            let dx = if k & 1 == 1 { half } else { 0.0 };
            let dy = if k & 2 == 2 { half } else { 0.0 };
            self.quads.push(Quad::new(x0 + dx, y0 + dy, half, Some(q)));
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.quads[q].children = Some(children);
        for j in std::mem::take(&mut self.quads[q].bodies) {
            let child = children[self.quads[q].quadrant(bodies[j].x, bodies[j].y)];
            self.quads[child].bodies.push(j);
            self.leaf_of[j] = child;
        }
    }

    fn accumulate(&mut self, bodies: &[Body]) {
        for q in (0..self.quads.len()).rev() {
            let (count, sx, sy) = match self.quads[q].children {
                Some(children) => children.iter().fold((0, 0.0, 0.0), |(n, sx, sy), &c| {
                    let child = &self.quads[c];
                    (n + child.count, sx + child.cx * child.count as f64, sy + child.cy * child.count as f64)
                }),
                None => self.quads[q]
                    .bodies
                    .iter()
                    .fold((0, 0.0, 0.0), |(n, sx, sy), &j| (n + 1, sx + bodies[j].x, sy + bodies[j].y)),
            };
            let quad = &mut self.quads[q];
            quad.count = count;
            if count > 0 {
                quad.cx = sx / count as f64;
                quad.cy = sy / count as f64;
            }
        }
    }

    /// The leaf and all of its ancestors.
    fn path_to(&self, leaf: usize) -> Vec<usize> {
        let mut path = vec![leaf];
        while let Some(parent) = self.quads[path[path.len() - 1]].parent {
            path.push(parent);
        }
        path
    }
}

/// Keeps bodies from overlapping given per-body radii.
pub struct CollideForce {
    radii: Vec<f64>,
    strength: f64,
}

impl CollideForce {
    pub fn new(radii: Vec<f64>) -> Self {
        Self { radii, strength: 1.0 }
    }
}

impl Force for CollideForce {
    fn apply(&mut self, bodies: &mut [Body], _alpha: f64, rng: &mut Lcg) {
        let n = bodies.len();
        for i in 0..n {
            let ri = self.radii[i];
            let ri2 = ri * ri;
            for j in (i + 1)..n {
                let rj = self.radii[j];
                let xi = bodies[i].x + bodies[i].vx;
                let yi = bodies[i].y + bodies[i].vy;
                let mut x = xi - bodies[j].x - bodies[j].vx;
                let mut y = yi - bodies[j].y - bodies[j].vy;
                let mut l = x * x + y * y;
                let r = ri + rj;
                if l >= r * r {
                    continue;
                }
                if x == 0.0 {
                    x = rng.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = rng.jiggle();
                    l += y * y;
                }
                let dist = l.sqrt();
                let push = (r - dist) / dist * self.strength;
                x *= push;
                y *= push;
                let rj2 = rj * rj;
                let share = rj2 / (ri2 + rj2);
                bodies[i].vx += x * share;
                bodies[i].vy += y * share;
                bodies[j].vx -= x * (1.0 - share);
                bodies[j].vy -= y * (1.0 - share);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Pulls each body toward a per-body coordinate on one axis.
pub struct PositionForce {
    axis: Axis,
    targets: Vec<f64>,
    strength: f64,
}

impl PositionForce {
    pub fn new(axis: Axis, targets: Vec<f64>, strength: f64) -> Self {
        Self {
            axis,
            targets,
            strength,
        }
    }
}

impl Force for PositionForce {
    fn apply(&mut self, bodies: &mut [Body], alpha: f64, _rng: &mut Lcg) {
        for (body, target) in bodies.iter_mut().zip(&self.targets) {
            match self.axis {
                Axis::X => body.vx += (target - body.x) * self.strength * alpha,
                Axis::Y => body.vy += (target - body.y) * self.strength * alpha,
            }
        }
    }
}
