//! Seeded parametric structural models used as the base training corpus
//!
//! Each [`SampleKind`] draws its dimensions from a fixed range and lays out
//! nodes and members with ground-truth building type, frame system and
//! member roles.

use super::TrainingCorpus;
use framewise_core::{Geometry, Member, Node, Restraints, StructuralModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parametric model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleKind {
    SingleGableHangar,
    MultiGableHangar,
    TrussSingleGable,
    MonoSlopeHangar,
    IndustrialWarehouse,
    CarShedCanopy,
    SignageBillboard,
    SymmetricMultiStory,
    ComplexMultiStory,
    SportsFacility,
}

impl SampleKind {
    pub const ALL: [SampleKind; 10] = [
        Self::SingleGableHangar,
        Self::MultiGableHangar,
        Self::TrussSingleGable,
        Self::MonoSlopeHangar,
        Self::IndustrialWarehouse,
        Self::CarShedCanopy,
        Self::SignageBillboard,
        Self::SymmetricMultiStory,
        Self::ComplexMultiStory,
        Self::SportsFacility,
    ];

    pub fn building_type(&self) -> &'static str {
        match self {
            Self::SingleGableHangar => "SINGLE_GABLE_HANGAR",
            Self::MultiGableHangar => "MULTI_GABLE_HANGAR",
            Self::TrussSingleGable => "TRUSS_SINGLE_GABLE",
            Self::MonoSlopeHangar => "MONO_SLOPE_HANGAR",
            Self::IndustrialWarehouse => "INDUSTRIAL_WAREHOUSE",
            Self::CarShedCanopy => "CAR_SHED_CANOPY",
            Self::SignageBillboard => "SIGNAGE_BILLBOARD",
            Self::SymmetricMultiStory => "SYMMETRIC_MULTI_STORY",
            Self::ComplexMultiStory => "COMPLEX_MULTI_STORY",
            Self::SportsFacility => "SPORTS_FACILITY",
        }
    }

    pub fn frame_system(&self) -> &'static str {
        match self {
            Self::SingleGableHangar
            | Self::MultiGableHangar
            | Self::MonoSlopeHangar
            | Self::SymmetricMultiStory => "MOMENT",
            Self::IndustrialWarehouse => "BRACED",
            Self::TrussSingleGable | Self::SportsFacility => "TRUSS",
            Self::CarShedCanopy | Self::SignageBillboard => "CANTILEVER",
            Self::ComplexMultiStory => "DUAL",
        }
    }

    /// Build one model of this kind
    pub fn generate(&self, id: impl Into<String>, rng: &mut StdRng) -> StructuralModel {
        let mut b = ModelBuilder::new(id);
        match self {
            Self::SingleGableHangar => gable(&mut b, rng, 1),
            Self::MultiGableHangar => {
                let spans = rng.gen_range(2..=3);
                gable(&mut b, rng, spans)
            }
            Self::TrussSingleGable => truss_hall(&mut b, rng, (40.0, 90.0), (14.0, 24.0)),
            Self::MonoSlopeHangar => mono_slope(&mut b, rng),
            Self::IndustrialWarehouse => warehouse(&mut b, rng),
            Self::CarShedCanopy => canopy(&mut b, rng),
            Self::SignageBillboard => billboard(&mut b, rng),
            Self::SymmetricMultiStory => multi_story(&mut b, rng, false),
            Self::ComplexMultiStory => multi_story(&mut b, rng, true),
            Self::SportsFacility => truss_hall(&mut b, rng, (150.0, 240.0), (35.0, 55.0)),
        }
        b.finish(self.building_type(), self.frame_system())
    }
}

/// Deterministic sample generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCorpus {
    pub seed: u64,
    pub per_kind: usize,
}

impl Default for SampleCorpus {
    fn default() -> Self {
        Self {
            seed: 42,
            per_kind: 12,
        }
    }
}

impl SampleCorpus {
    pub fn new(seed: u64, per_kind: usize) -> Self {
        Self { seed, per_kind }
    }

    /// All sample models, kind by kind
    pub fn models(&self) -> Vec<StructuralModel> {
        let mut models = Vec::with_capacity(self.per_kind * SampleKind::ALL.len());
        for (k, kind) in SampleKind::ALL.iter().enumerate() {
            for i in 0..self.per_kind {
                let stream = ((k as u64) << 32) | i as u64;
                let mut rng = StdRng::seed_from_u64(self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let id = format!("{}-{}", kind.building_type().to_ascii_lowercase(), i);
                models.push(kind.generate(id, &mut rng));
            }
        }
        models
    }

    /// Extracted training rows of all sample models
    pub fn corpus(&self) -> TrainingCorpus {
        TrainingCorpus::from_models(&self.models())
    }
}

/// Uniform draw rounded to half units
fn draw(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    (rng.gen_range(lo..hi) * 2.0).round() / 2.0
}

struct ModelBuilder {
    model: StructuralModel,
    geometry: Geometry,
}

impl ModelBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            model: StructuralModel::new(id),
            geometry: Geometry::default(),
        }
    }

    fn node(&mut self, id: String, x: f64, y: f64, z: f64) -> String {
        self.model.nodes.push(Node::new(id.clone(), x, y, z));
        id
    }

    fn support(&mut self, id: String, x: f64, y: f64, restraints: Restraints) -> String {
        self.model
            .nodes
            .push(Node::new(id.clone(), x, y, 0.0).with_restraints(restraints));
        id
    }

    fn member(&mut self, start: &str, end: &str, kind: &str, role: &str) -> &mut Member {
        let id = format!("m{}", self.model.members.len() + 1);
        self.model
            .members
            .push(Member::new(id, start, end).with_type(kind).with_role(role));
        let last = self.model.members.len() - 1;
        &mut self.model.members[last]
    }

    fn finish(mut self, building_type: &str, frame_system: &str) -> StructuralModel {
        self.model.building_type = Some(building_type.to_string());
        self.model.frame_system = Some(frame_system.to_string());
        self.model.geometry = Some(self.geometry);
        self.model
    }
}

/// Portal-frame gable hangar with `spans` side-by-side gables
fn gable(b: &mut ModelBuilder, rng: &mut StdRng, spans: usize) {
    let frames = rng.gen_range(4..=8);
    let bay = draw(rng, 20.0, 30.0);
    let span = draw(rng, 50.0, 110.0);
    let eave = draw(rng, 20.0, 35.0);
    let rise = draw(rng, 6.0, 16.0);

    for f in 0..frames {
        let x = f as f64 * bay;
        for j in 0..=spans {
            let y = j as f64 * span;
            let base = b.support(format!("b{f}_{j}"), x, y, Restraints::fixed());
            let top = b.node(format!("e{f}_{j}"), x, y, eave);
            b.member(&base, &top, "COLUMN", "Column");
        }
        for s in 0..spans {
            let ridge = b.node(format!("r{f}_{s}"), x, (s as f64 + 0.5) * span, eave + rise);
            for j in [s, s + 1] {
                b.member(&format!("e{f}_{j}"), &ridge, "BEAM", "Beam")
                    .tag = Some("roof rafter".into());
            }
        }
        if f > 0 {
            for j in 0..=spans {
                b.member(&format!("e{}_{j}", f - 1), &format!("e{f}_{j}"), "PURLIN", "Purlin");
            }
            for s in 0..spans {
                b.member(&format!("r{}_{s}", f - 1), &format!("r{f}_{s}"), "PURLIN", "Purlin");
            }
        }
    }

    b.geometry = Geometry {
        building_length: Some((frames - 1) as f64 * bay),
        building_width: Some(spans as f64 * span),
        total_height: Some(eave + rise),
        eave_height: Some(eave),
        roof_slope: Some((rise / (span / 2.0)).atan().to_degrees()),
        frame_count: Some(frames as u32),
        bay_spacings: vec![bay; frames - 1],
    };
}

fn mono_slope(b: &mut ModelBuilder, rng: &mut StdRng) {
    let frames = rng.gen_range(4..=7);
    let bay = draw(rng, 18.0, 28.0);
    let span = draw(rng, 40.0, 80.0);
    let low = draw(rng, 18.0, 26.0);
    let high = low + draw(rng, 6.0, 14.0);

    for f in 0..frames {
        let x = f as f64 * bay;
        for (j, (y, h)) in [(0.0, low), (span, high)].into_iter().enumerate() {
            let base = b.support(format!("b{f}_{j}"), x, y, Restraints::fixed());
            let top = b.node(format!("e{f}_{j}"), x, y, h);
            b.member(&base, &top, "COLUMN", "Column");
        }
        b.member(&format!("e{f}_0"), &format!("e{f}_1"), "BEAM", "Beam")
            .tag = Some("roof".into());
        if f > 0 {
            for j in 0..2 {
                b.member(&format!("e{}_{j}", f - 1), &format!("e{f}_{j}"), "PURLIN", "Purlin");
            }
        }
    }

    b.geometry = Geometry {
        building_length: Some((frames - 1) as f64 * bay),
        building_width: Some(span),
        total_height: Some(high),
        eave_height: Some(low),
        roof_slope: Some(((high - low) / span).atan().to_degrees()),
        frame_count: Some(frames as u32),
        bay_spacings: vec![bay; frames - 1],
    };
}

/// Pinned columns carrying pitched trusses
fn truss_hall(b: &mut ModelBuilder, rng: &mut StdRng, span_range: (f64, f64), eave_range: (f64, f64)) {
    let frames = rng.gen_range(4..=7);
    let bay = draw(rng, 20.0, 30.0);
    let span = draw(rng, span_range.0, span_range.1);
    let eave = draw(rng, eave_range.0, eave_range.1);
    let rise = span * rng.gen_range(0.12..0.2);
    let panels = 2 * rng.gen_range(3..=5);
    let panel = span / panels as f64;

    for f in 0..frames {
        let x = f as f64 * bay;
        for (j, y) in [0.0, span].into_iter().enumerate() {
            let base = b.support(format!("b{f}_{j}"), x, y, Restraints::pinned());
            let top = b.node(format!("e{f}_{j}"), x, y, eave);
            b.member(&base, &top, "COLUMN", "Column");
        }

        // bottom chord nodes at eave level, top chord follows the gable
        let bottom: Vec<String> = (0..=panels)
            .map(|p| match p {
                0 => format!("e{f}_0"),
                p if p == panels => format!("e{f}_1"),
                p => b.node(format!("t{f}_{p}"), x, p as f64 * panel, eave),
            })
            .collect();
        let top: Vec<String> = (0..=panels)
            .map(|p| {
                if p == 0 || p == panels {
                    bottom[p].clone()
                } else {
                    let y = p as f64 * panel;
                    let z = eave + rise * (1.0 - (y - span / 2.0).abs() / (span / 2.0));
                    b.node(format!("u{f}_{p}"), x, y, z)
                }
            })
            .collect();

        for p in 0..panels {
            b.member(&bottom[p], &bottom[p + 1], "TRUSS_CHORD", "TrussChord");
            b.member(&top[p], &top[p + 1], "TRUSS_CHORD", "TrussChord")
                .tag = Some("roof truss".into());
            if p > 0 {
                b.member(&bottom[p], &top[p], "TRUSS_DIAGONAL", "TrussWeb");
            }
            let diagonal = if p < panels / 2 {
                (&bottom[p + 1], &top[p])
            } else {
                (&bottom[p], &top[p + 1])
            };
            if p > 0 && p + 1 < panels {
                b.member(diagonal.0, diagonal.1, "TRUSS_DIAGONAL", "TrussWeb");
            }
        }

        if f > 0 {
            b.member(&format!("e{}_0", f - 1), &format!("e{f}_0"), "PURLIN", "Purlin");
            b.member(&format!("e{}_1", f - 1), &format!("e{f}_1"), "PURLIN", "Purlin");
            let ridge = panels / 2;
            b.member(&format!("u{}_{ridge}", f - 1), &format!("u{f}_{ridge}"), "PURLIN", "Purlin");
        }
    }

    b.geometry = Geometry {
        building_length: Some((frames - 1) as f64 * bay),
        building_width: Some(span),
        total_height: Some(eave + rise),
        eave_height: Some(eave),
        roof_slope: Some((rise / (span / 2.0)).atan().to_degrees()),
        frame_count: Some(frames as u32),
        bay_spacings: vec![bay; frames - 1],
    };
}

/// Long, low gable on pinned bases with X-bracing in the end bays
fn warehouse(b: &mut ModelBuilder, rng: &mut StdRng) {
    let frames = rng.gen_range(8..=14);
    let bay = draw(rng, 24.0, 32.0);
    let span = draw(rng, 80.0, 140.0);
    let eave = draw(rng, 24.0, 36.0);
    let rise = span * rng.gen_range(0.03..0.06);

    for f in 0..frames {
        let x = f as f64 * bay;
        for (j, y) in [0.0, span].into_iter().enumerate() {
            let base = b.support(format!("b{f}_{j}"), x, y, Restraints::pinned());
            let top = b.node(format!("e{f}_{j}"), x, y, eave);
            b.member(&base, &top, "COLUMN", "Column");
        }
        let ridge = b.node(format!("r{f}"), x, span / 2.0, eave + rise);
        for j in 0..2 {
            b.member(&format!("e{f}_{j}"), &ridge, "BEAM", "Beam")
                .tag = Some("roof".into());
        }
        if f > 0 {
            let prev = f - 1;
            for j in 0..2 {
                b.member(&format!("e{prev}_{j}"), &format!("e{f}_{j}"), "BEAM", "Beam");
            }
            b.member(&format!("r{prev}"), &format!("r{f}"), "PURLIN", "Purlin");

            let braced = f == 1 || f == frames - 1 || f == frames / 2;
            if braced {
                for j in 0..2 {
                    b.member(&format!("b{prev}_{j}"), &format!("e{f}_{j}"), "BRACE", "Brace");
                    b.member(&format!("b{f}_{j}"), &format!("e{prev}_{j}"), "BRACE", "Brace");
                }
                b.member(&format!("e{prev}_0"), &format!("r{f}"), "BRACE", "Brace")
                    .tag = Some("roof brace".into());
                b.member(&format!("e{prev}_1"), &format!("r{f}"), "BRACE", "Brace")
                    .tag = Some("roof brace".into());
            }
        }
    }

    b.geometry = Geometry {
        building_length: Some((frames - 1) as f64 * bay),
        building_width: Some(span),
        total_height: Some(eave + rise),
        eave_height: Some(eave),
        roof_slope: Some((rise / (span / 2.0)).atan().to_degrees()),
        frame_count: Some(frames as u32),
        bay_spacings: vec![bay; frames - 1],
    };
}

/// Single column line with arms cantilevering to both sides
fn canopy(b: &mut ModelBuilder, rng: &mut StdRng) {
    let columns = rng.gen_range(3..=8);
    let bay = draw(rng, 15.0, 25.0);
    let height = draw(rng, 9.0, 14.0);
    let arm = draw(rng, 8.0, 16.0);
    let drop = draw(rng, 0.0, 1.5);

    for c in 0..columns {
        let x = c as f64 * bay;
        let base = b.support(format!("b{c}"), x, arm, Restraints::fixed());
        let top = b.node(format!("t{c}"), x, arm, height);
        b.member(&base, &top, "COLUMN", "Column");
        for (side, y) in [(0, 0.0), (1, 2.0 * arm)] {
            let tip = b.node(format!("a{c}_{side}"), x, y, height - drop);
            b.member(&top, &tip, "BEAM", "CantileverBeam")
                .tag = Some("cantilever arm".into());
        }
        if c > 0 {
            b.member(&format!("t{}", c - 1), &top, "BEAM", "Beam");
            for side in 0..2 {
                b.member(&format!("a{}_{side}", c - 1), &format!("a{c}_{side}"), "BEAM", "CanopyBeam")
                    .tag = Some("roof edge".into());
            }
        }
    }

    b.geometry = Geometry {
        building_length: Some((columns - 1) as f64 * bay),
        building_width: Some(2.0 * arm),
        total_height: Some(height),
        eave_height: Some(height - drop),
        roof_slope: Some((drop / arm).atan().to_degrees()),
        frame_count: Some(columns as u32),
        bay_spacings: vec![bay; columns - 1],
    };
}

/// Tall posts carrying a framed sign panel that overhangs them
fn billboard(b: &mut ModelBuilder, rng: &mut StdRng) {
    let posts = rng.gen_range(1..=2);
    let height = draw(rng, 20.0, 45.0);
    let panel_width = draw(rng, 24.0, 48.0);
    let panel_height = draw(rng, 8.0, 16.0);
    let rails = rng.gen_range(3..=5);
    let studs = rng.gen_range(4..=7);

    let post_x: Vec<f64> = if posts == 1 {
        vec![panel_width / 2.0]
    } else {
        vec![panel_width * 0.3, panel_width * 0.7]
    };
    for (p, x) in post_x.iter().enumerate() {
        let base = b.support(format!("b{p}"), *x, 0.0, Restraints::fixed());
        let top = b.node(format!("p{p}"), *x, 0.0, height);
        b.member(&base, &top, "COLUMN", "Column");
    }

    let stud_spacing = panel_width / (studs - 1) as f64;
    let rail_spacing = panel_height / (rails - 1) as f64;
    for r in 0..rails {
        let z = height + r as f64 * rail_spacing;
        for s in 0..studs {
            b.node(format!("g{r}_{s}"), s as f64 * stud_spacing, 0.0, z);
            if s > 0 {
                b.member(&format!("g{r}_{}", s - 1), &format!("g{r}_{s}"), "BEAM", "CantileverBeam");
            }
            if r > 0 {
                b.member(&format!("g{}_{s}", r - 1), &format!("g{r}_{s}"), "COLUMN", "Column");
            }
        }
    }
    // tie each post top into the nearest stud of the bottom rail
    for (p, x) in post_x.iter().enumerate() {
        let nearest = (x / stud_spacing).round() as usize;
        b.member(&format!("p{p}"), &format!("g0_{nearest}"), "BEAM", "Beam");
    }

    b.geometry = Geometry {
        building_length: Some(panel_width),
        building_width: Some(1.0),
        total_height: Some(height + panel_height),
        eave_height: Some(height),
        roof_slope: Some(0.0),
        frame_count: Some(posts as u32),
        bay_spacings: Vec::new(),
    };
}

/// Orthogonal beam-column grid; the complex variant is L-shaped with
/// uneven bays and braced perimeter bays
fn multi_story(b: &mut ModelBuilder, rng: &mut StdRng, complex: bool) {
    let (nx, ny) = (rng.gen_range(3..=5), rng.gen_range(2..=4));
    let floors = if complex {
        rng.gen_range(5..=10)
    } else {
        rng.gen_range(3..=8)
    };
    let story = draw(rng, 11.0, 15.0);

    let mut xs = vec![0.0];
    let mut ys = vec![0.0];
    let base_bay = draw(rng, 20.0, 30.0);
    for i in 0..nx {
        let bay = if complex { draw(rng, 16.0, 36.0) } else { base_bay };
        xs.push(xs[i] + bay);
    }
    for j in 0..ny {
        let bay = if complex { draw(rng, 16.0, 36.0) } else { base_bay };
        ys.push(ys[j] + bay);
    }

    // L-shape: drop the far quadrant
    let present = |i: usize, j: usize| !complex || i <= nx / 2 || j <= ny / 2;

    for i in 0..=nx {
        for j in 0..=ny {
            if !present(i, j) {
                continue;
            }
            b.support(format!("n{i}_{j}_0"), xs[i], ys[j], Restraints::fixed());
            for f in 1..=floors {
                b.node(format!("n{i}_{j}_{f}"), xs[i], ys[j], f as f64 * story);
                b.member(&format!("n{i}_{j}_{}", f - 1), &format!("n{i}_{j}_{f}"), "COLUMN", "Column");
            }
        }
    }

    for f in 1..=floors {
        for i in 0..=nx {
            for j in 0..=ny {
                if !present(i, j) {
                    continue;
                }
                if i < nx && present(i + 1, j) {
                    b.member(&format!("n{i}_{j}_{f}"), &format!("n{}_{j}_{f}", i + 1), "BEAM", "Beam");
                }
                if j < ny && present(i, j + 1) {
                    b.member(&format!("n{i}_{j}_{f}"), &format!("n{i}_{}_{f}", j + 1), "BEAM", "Beam");
                }
            }
        }
        if complex {
            // X-bracing in the first and last bay along y = 0
            for i in [0, nx - 1] {
                b.member(&format!("n{i}_0_{}", f - 1), &format!("n{}_0_{f}", i + 1), "BRACE", "Brace");
                b.member(&format!("n{}_0_{}", i + 1, f - 1), &format!("n{i}_0_{f}"), "BRACE", "Brace");
            }
        }
    }

    b.geometry = Geometry {
        building_length: xs.last().copied(),
        building_width: ys.last().copied(),
        total_height: Some(floors as f64 * story),
        eave_height: Some(floors as f64 * story),
        roof_slope: Some(0.0),
        frame_count: Some((nx + 1) as u32),
        bay_spacings: xs.windows(2).map(|w| w[1] - w[0]).collect(),
    };
}
