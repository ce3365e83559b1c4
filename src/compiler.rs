//! The compile driver: runs every stage over every entity of a scene.

use crate::aabb::Aabb;
use crate::bsp::{AxialBalancedStrategy, BspFace, BspTree, InterAreaPortal};
use crate::errors::{CompileError, Diagnostic, PrimitiveKind};
use crate::float_types::{DIST_EPSILON, NORMAL_EPSILON, Real, VERTEX_EPSILON};
use crate::light::{LightCapPolicy, ProcLight, cull_lights};
use crate::material::MaterialLookup;
use crate::optimize::island::shared_vertices;
use crate::optimize::{IslandOutcome, ProcArea, add_tri_list_to_area, fix_tjunctions, optimize_group};
use crate::plane::PlaneSet;
use crate::primitive::brush::winding_to_tris;
use crate::primitive::{MergeGroup, MergeGroups, ProcBrush, ProcPrimitive, ProcTri, patch};
use crate::proc_file::{ProcEntity, ProcFile};
use crate::progress::ProgressSink;
use crate::scene::{MapEntity, Scene};
use nalgebra::{Point3, Vector3};
use std::ops::ControlFlow;
use std::path::Path;

/// Tunables of one compile.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub normal_epsilon: Real,
    pub dist_epsilon: Real,
    /// Vertices closer than this are welded by the T-junction pass.
    pub vertex_epsilon: Real,
    /// Subdivisions per sub-patch for patches that do not set their own.
    pub patch_subdivisions: [usize; 2],
    pub light_cap_policy: LightCapPolicy,
    pub split_strategy: AxialBalancedStrategy,
    pub fix_tjunctions: bool,
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            normal_epsilon: NORMAL_EPSILON,
            dist_epsilon: DIST_EPSILON,
            vertex_epsilon: VERTEX_EPSILON,
            patch_subdivisions: [4, 4],
            light_cap_policy: LightCapPolicy::default(),
            split_strategy: AxialBalancedStrategy::default(),
            fix_tjunctions: true,
            optimize: true,
        }
    }
}

impl CompileOptions {
    pub fn with_plane_epsilons(mut self, normal_epsilon: Real, dist_epsilon: Real) -> Self {
        self.normal_epsilon = normal_epsilon;
        self.dist_epsilon = dist_epsilon;
        self
    }

    pub fn with_vertex_epsilon(mut self, vertex_epsilon: Real) -> Self {
        self.vertex_epsilon = vertex_epsilon;
        self
    }

    pub fn with_patch_subdivisions(mut self, subdivisions: [usize; 2]) -> Self {
        self.patch_subdivisions = subdivisions;
        self
    }

    pub fn with_light_cap_policy(mut self, policy: LightCapPolicy) -> Self {
        self.light_cap_policy = policy;
        self
    }

    pub fn with_split_weights(mut self, split_weight: Real, balance_weight: Real) -> Self {
        self.split_strategy = AxialBalancedStrategy { split_weight, balance_weight };
        self
    }

    pub fn with_tjunction_fix(mut self, enabled: bool) -> Self {
        self.fix_tjunctions = enabled;
        self
    }

    pub fn with_optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }
}

/// A compiled map and everything worth telling the user about it.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub proc_file: ProcFile,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: CompileStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Triangles put in areas, before T-junction repair and optimization.
    pub tris_in_areas: usize,
    /// Triangles after T-junction repair.
    pub tris_fixed: usize,
    /// Triangles written.
    pub tris_out: usize,
    pub groups_optimized: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    pub options: CompileOptions,
}

/// Per-compile state shared by all entities.
struct CompileContext<'a> {
    options: &'a CompileOptions,
    materials: &'a dyn MaterialLookup,
    progress: &'a mut dyn ProgressSink,
    planes: PlaneSet,
    merge_groups: MergeGroups,
    lights: Vec<ProcLight>,
    diagnostics: Vec<Diagnostic>,
    stats: CompileStats,
}

impl CompileContext<'_> {
    /// Report progress; a cancel request becomes an error.
    fn checkpoint(&mut self, current: usize, total: usize, stage: &str) -> Result<(), CompileError> {
        match self.progress.report(current, total, stage) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => {
                tracing::info!(stage, "compile cancelled");
                Err(CompileError::Cancelled { stage: stage.to_string() })
            },
        }
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    /// Compile `scene` and write the result to `path`. Nothing is written if
    /// the compile is cancelled.
    pub fn compile_to_file(
        &self,
        scene: &Scene,
        materials: &dyn MaterialLookup,
        progress: &mut dyn ProgressSink,
        path: &Path,
    ) -> Result<CompileOutput, CompileError> {
        let output = self.compile(scene, materials, progress)?;
        output.proc_file.save_to_file(path)?;
        Ok(output)
    }

    /// Compile `scene` in memory.
    pub fn compile(
        &self,
        scene: &Scene,
        materials: &dyn MaterialLookup,
        progress: &mut dyn ProgressSink,
    ) -> Result<CompileOutput, CompileError> {
        let mut ctx = CompileContext {
            options: &self.options,
            materials,
            progress,
            planes: PlaneSet::with_epsilons(self.options.normal_epsilon, self.options.dist_epsilon),
            merge_groups: MergeGroups::default(),
            lights: scene.all_lights().iter().map(ProcLight::new).collect(),
            diagnostics: Vec::new(),
            stats: CompileStats::default(),
        };

        // entities without geometry (lights, info entities) only contribute
        // their origins; the world is always compiled
        let compiled: Vec<usize> = scene
            .entities
            .iter()
            .enumerate()
            .filter(|(num, e)| *num == 0 || e.is_world() || !e.brushes.is_empty() || !e.patches.is_empty())
            .map(|(num, _)| num)
            .collect();
        let occupants = occupants(scene, &ctx.lights);
        tracing::info!(
            entities = compiled.len(),
            lights = ctx.lights.len(),
            occupants = occupants.len(),
            "compiling map"
        );

        let mut proc_file = ProcFile::default();
        let total = compiled.len();
        for (step, &entity_num) in compiled.iter().enumerate() {
            let entity = &scene.entities[entity_num];
            ctx.checkpoint(step, total, &format!("entity {entity_num}"))?;
            let proc_entity = compile_entity(&mut ctx, entity, entity_num, &occupants, &mut proc_file)?;
            proc_file.entities.push(proc_entity);
        }
        ctx.checkpoint(total, total, "done")?;

        proc_file.planes = ctx.planes;
        proc_file.lights = ctx.lights;
        proc_file.num_portals = proc_file.inter_area_portals.len();
        proc_file.num_patches = proc_file
            .entities
            .iter()
            .flat_map(|e| e.primitives.iter())
            .filter(|p| p.patch().is_some())
            .count();
        if let Some((brushes, groups)) = proc_file.world().map(|w| (w.brushes().count(), w.num_groups())) {
            proc_file.num_world_brushes = brushes;
            proc_file.num_world_tri_surfs = groups;
        }
        let mut bounds = Aabb::empty();
        for entity in &proc_file.entities {
            bounds.add_aabb(&entity.tree.bounds.translated(&entity.origin.coords));
        }
        proc_file.bounds = bounds;

        tracing::info!(
            areas = proc_file.num_areas(),
            portals = proc_file.num_portals,
            tris = ctx.stats.tris_out,
            leaked = proc_file.has_leak(),
            "compile finished"
        );
        Ok(CompileOutput {
            proc_file,
            diagnostics: ctx.diagnostics,
            stats: ctx.stats,
        })
    }
}

/// Points that must be inside the sealed world: origins of other entities and
/// every light.
fn occupants(scene: &Scene, lights: &[ProcLight]) -> Vec<Point3<Real>> {
    let mut points: Vec<Point3<Real>> = scene
        .entities
        .iter()
        .enumerate()
        .filter(|(num, e)| *num != 0 && !e.is_world() && e.classname() != "light")
        .filter_map(|(_, e)| e.origin())
        .collect();
    points.extend(lights.iter().map(|l| l.origin));
    points
}

fn compile_entity(
    ctx: &mut CompileContext<'_>,
    entity: &MapEntity,
    entity_num: usize,
    occupants: &[Point3<Real>],
    proc_file: &mut ProcFile,
) -> Result<ProcEntity, CompileError> {
    let is_world = entity_num == 0 || entity.is_world();
    let origin = if is_world { Point3::origin() } else { entity.origin().unwrap_or_else(Point3::origin) };
    let stage = |name: &str| format!("entity {entity_num}: {name}");

    let primitives = extract_primitives(ctx, entity, entity_num, &origin.coords);
    let brushes: Vec<&ProcBrush> = primitives.iter().filter_map(ProcPrimitive::brush).collect();
    tracing::debug!(
        entity_num,
        brushes = brushes.len(),
        patches = primitives.len() - brushes.len(),
        "primitives extracted"
    );

    // structural faces: everything that seals or separates areas
    let faces: Vec<BspFace> = brushes
        .iter()
        .filter(|b| b.opaque || b.area_portal)
        .flat_map(|b| b.sides.iter())
        .filter_map(|side| {
            side.winding.as_ref().map(|w| BspFace {
                plane_num: side.plane_num,
                winding: w.clone(),
            })
        })
        .collect();

    let mut tree = BspTree::build(faces, &ctx.planes, &ctx.options.split_strategy);
    tree.make_tree_portals(&ctx.planes);
    tree.filter_brushes(&brushes, &ctx.planes);
    ctx.checkpoint(0, 1, &stage("bsp"))?;

    let num_areas = if is_world {
        let outcome = tree.flood_entities(entity_num, occupants, &ctx.planes);
        for diagnostic in outcome.diagnostics {
            ctx.diagnose(diagnostic);
        }
        if let Some(leak) = outcome.leak {
            tracing::warn!(points = leak.points.len(), "map leaked");
            if proc_file.leak.is_none() {
                proc_file.leak = Some(leak);
            }
        }
        tree.fill_outside();
        let num_areas = tree.flood_areas();
        let portals: Vec<InterAreaPortal> = tree.inter_area_portals();
        tracing::debug!(entity_num, areas = num_areas, portals = portals.len(), "areas flooded");
        proc_file.inter_area_portals.extend(portals);
        num_areas
    } else {
        tree.single_area()
    };
    ctx.checkpoint(0, 1, &stage("flood"))?;

    let mut areas = vec![ProcArea::default(); num_areas];
    put_primitives_in_areas(ctx, &tree, &primitives, &mut areas);
    let tris_in_areas: usize = areas.iter().map(ProcArea::num_tris).sum();
    ctx.stats.tris_in_areas += tris_in_areas;

    if ctx.options.fix_tjunctions {
        fix_tjunctions(&mut areas, ctx.options.vertex_epsilon);
    }
    ctx.stats.tris_fixed += areas.iter().map(ProcArea::num_tris).sum::<usize>();

    // group numbers reported below index the written groups
    for area in &mut areas {
        area.remove_empty_groups();
    }

    for (area_num, area) in areas.iter_mut().enumerate() {
        for (group_num, group) in area.groups.iter_mut().enumerate() {
            let plane = (!group.smoothed).then(|| {
                let mut plane = ctx.planes[group.plane_num];
                plane.w += plane.normal.dot(&origin.coords);
                plane
            });
            let cull = cull_lights(
                &ctx.lights,
                &group.bounds.translated(&origin.coords),
                plane.as_ref(),
                ctx.options.light_cap_policy,
            );
            if cull.capped() {
                ctx.diagnose(Diagnostic::LightCapExceeded {
                    entity: entity_num,
                    area: area_num,
                    group: group_num,
                    count: cull.touching,
                });
            }
            group.lights = cull.lights;
        }
        ctx.checkpoint(area_num + 1, num_areas, &stage("lights"))?;
    }

    if ctx.options.optimize {
        let shared = shared_vertices(&areas);
        let total: usize = areas.iter().map(|a| a.groups.len()).sum();
        let mut done = 0;
        for area in &mut areas {
            for group in &mut area.groups {
                if let IslandOutcome::Optimized { .. } = optimize_group(group, &shared) {
                    ctx.stats.groups_optimized += 1;
                }
                done += 1;
                ctx.checkpoint(done, total, &stage("optimize"))?;
            }
        }
    }
    let tris_out: usize = areas.iter().map(ProcArea::num_tris).sum();
    ctx.stats.tris_out += tris_out;
    tracing::debug!(entity_num, tris_in_areas, tris_out, "entity optimized");

    Ok(ProcEntity {
        entity_num,
        name: entity
            .value("name")
            .map(str::to_string)
            .unwrap_or_else(|| if is_world { "worldspawn".to_string() } else { format!("entity_{entity_num}") }),
        classname: entity.classname().to_string(),
        origin,
        primitives,
        tree,
        num_areas,
        areas,
    })
}

/// Brushes and patches of `entity` in entity space. Degenerate ones are
/// reported and left out.
fn extract_primitives(
    ctx: &mut CompileContext<'_>,
    entity: &MapEntity,
    entity_num: usize,
    origin: &Vector3<Real>,
) -> Vec<ProcPrimitive> {
    let mut primitives = Vec::with_capacity(entity.brushes.len() + entity.patches.len());
    for (brush_num, brush) in entity.brushes.iter().enumerate() {
        match ProcBrush::from_map_brush(
            brush,
            entity_num,
            brush_num,
            origin,
            &mut ctx.planes,
            ctx.materials,
            &mut ctx.merge_groups,
        ) {
            Some(brush) => primitives.push(ProcPrimitive::Brush(brush)),
            None => ctx.diagnose(Diagnostic::DegenerateGeometry {
                entity: entity_num,
                primitive: brush_num,
                kind: PrimitiveKind::Brush,
            }),
        }
    }
    for (patch_num, map_patch) in entity.patches.iter().enumerate() {
        let info = ctx.materials.material_info(&map_patch.material);
        let merge_group = if info.discrete { ctx.merge_groups.allocate() } else { MergeGroup::NONE };
        match patch::tessellate(map_patch, ctx.options.patch_subdivisions, origin, &mut ctx.planes, merge_group) {
            Some(tris) => primitives.push(ProcPrimitive::Patch(tris)),
            None => ctx.diagnose(Diagnostic::DegenerateGeometry {
                entity: entity_num,
                primitive: entity.brushes.len() + patch_num,
                kind: PrimitiveKind::Patch,
            }),
        }
    }
    primitives
}

/// Clip every drawn surface into the areas it is visible from.
fn put_primitives_in_areas(ctx: &CompileContext<'_>, tree: &BspTree, primitives: &[ProcPrimitive], areas: &mut [ProcArea]) {
    for primitive in primitives {
        match primitive {
            ProcPrimitive::Brush(brush) => {
                for side in brush.sides.iter().filter(|s| s.info.drawn) {
                    let Some(winding) = &side.winding else {
                        continue;
                    };
                    let plane = ctx.planes[side.plane_num];
                    for (area, fragment) in tree.filter_winding(winding.clone(), side.plane_num, &ctx.planes) {
                        let tris = winding_to_tris(&fragment, side, &plane);
                        add_tri_list_to_area(&mut areas[area], area, tris, false, &ctx.planes);
                    }
                }
            },
            ProcPrimitive::Patch(tris) => {
                let drawn = tris.first().is_some_and(|t| ctx.materials.material_info(&t.material).drawn);
                if !drawn {
                    continue;
                }
                for tri in tris {
                    for (area, fragment) in tree.filter_winding(tri.winding(), tri.plane_num, &ctx.planes) {
                        let pieces: Vec<ProcTri> = tri.fragment(&fragment);
                        add_tri_list_to_area(&mut areas[area], area, pieces, true, &ctx.planes);
                    }
                }
            },
        }
    }
}
