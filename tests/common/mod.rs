use std::f64::consts::TAU;
use thunderbolt_lib::engine::dynamics::classify_state;
use thunderbolt_lib::engine::lattice::{Grid, Lattice};
use thunderbolt_lib::data::{
    BoundaryCondition, CellDelta, Coord, Doctrine, NeighborhoodType, RuleId, Ruleset, Thunderbit,
};

type CellMod = Box<dyn FnOnce(&mut Lattice)>;

#[allow(dead_code)]
pub struct LatticeBuilder {
    bounds: Coord,
    seed: Option<u64>,
    density: f64,
    template: Thunderbit,
    mods: Vec<CellMod>,
}

#[allow(dead_code)]
impl LatticeBuilder {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            bounds: Coord::new(x, y, z),
            seed: None,
            density: 0.3,
            template: Thunderbit::default(),
            mods: Vec::new(),
        }
    }

    /// Random cells instead of copies of the template.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_flow(mut self, flow: f64) -> Self {
        self.template.sigma_flow = flow;
        self.template.state = classify_state(flow, self.template.lambda_sensitivity);
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.template.phi_phase = phase;
        self
    }

    pub fn with_cell(mut self, x: i32, y: i32, z: i32, flow: f64, phase: f64) -> Self {
        self.mods.push(Box::new(move |lattice| {
            let cell = Thunderbit {
                state: classify_state(flow, 0.0),
                sigma_flow: flow,
                phi_phase: phase,
                ..Default::default()
            };
            lattice
                .insert(Coord::new(x, y, z), cell)
                .expect("cell outside test lattice");
        }));
        self
    }

    /// Spreads phases evenly around the circle in coordinate order.
    pub fn with_spread_phases(mut self) -> Self {
        self.mods.push(Box::new(|lattice| {
            let coords = lattice.sorted_coords();
            let n = coords.len() as f64;
            for (i, coord) in coords.into_iter().enumerate() {
                if let Some(cell) = lattice.cells.get_mut(&coord) {
                    cell.phi_phase = TAU * i as f64 / n;
                }
            }
        }));
        self
    }

    pub fn with_doctrines(mut self, names: &[&str]) -> Self {
        let doctrines: Vec<Doctrine> = names.iter().map(|n| Doctrine::new(*n)).collect();
        let seed = self.seed.unwrap_or(0);
        self.mods.push(Box::new(move |lattice| {
            lattice.assign_doctrines(&doctrines, seed);
        }));
        self
    }

    pub fn build(self) -> Lattice {
        let mut lattice = match self.seed {
            Some(seed) => Lattice::random(self.bounds, seed, self.density),
            None => Lattice::filled(self.bounds, &self.template),
        }
        .expect("Failed to create lattice in test builder");
        for modifier in self.mods {
            modifier(&mut lattice);
        }
        lattice
    }

    pub fn build_grid(self) -> Grid {
        Grid::Lattice(self.build())
    }
}

#[allow(dead_code)]
pub fn ruleset(rule: RuleId) -> Ruleset {
    Ruleset::new(rule)
}

#[allow(dead_code)]
pub fn moore_periodic(rule: RuleId) -> Ruleset {
    Ruleset::new(rule)
        .with_neighborhood(NeighborhoodType::MOORE)
        .with_boundary(BoundaryCondition::Periodic)
}

#[allow(dead_code)]
pub fn coords_of(deltas: &[CellDelta]) -> Vec<Coord> {
    let mut coords: Vec<Coord> = deltas.iter().map(|d| d.coord).collect();
    coords.sort();
    coords
}
