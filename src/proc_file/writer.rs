//! Text serialization of a [`ProcFile`].

use crate::bsp::NodeId;
use crate::errors::CompileError;
use crate::float_types::Real;
use crate::optimize::OptimizeGroup;
use crate::plane::PlaneSet;
use crate::primitive::MapVertex;
use crate::proc_file::{ProcEntity, ProcFile};
use crate::scene::LightShape;
use crate::winding::Winding;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use std::fmt::{self, Display};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A number without trailing zeros; near-integers print as integers and
/// magnitudes beyond `LARGEST_INTEGER` in exponent form.
struct Num(Real);

const LARGEST_INTEGER: Real = 1e15;

impl Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.abs() >= LARGEST_INTEGER {
            return write!(f, "{v:e}");
        }
        if (v - v.round()).abs() < 1e-6 {
            // avoid "-0"
            return write!(f, "{}", v.round() as i64);
        }
        let text = format!("{v:.6}");
        write!(f, "{}", text.trim_end_matches('0').trim_end_matches('.'))
    }
}

struct Vec3<'a>(&'a Vector3<Real>);

impl Display for Vec3<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {} {} {} )", Num(self.0.x), Num(self.0.y), Num(self.0.z))
    }
}

fn point(p: &Point3<Real>) -> Vec3<'_> {
    Vec3(&p.coords)
}

/// Names are written quoted; embedded quotes would break the tokenizer.
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

impl ProcFile {
    /// Write the compiled map to `path` through a temporary file in the same
    /// directory, so a failed write never leaves a partial file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), CompileError> {
        let fail = |source: io::Error| CompileError::Serialization {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
        {
            let mut out = BufWriter::new(temp.as_file_mut());
            self.write_to(&mut out).map_err(fail)?;
            out.flush().map_err(fail)?;
        }
        temp.as_file().sync_all().map_err(fail)?;
        temp.persist(path).map_err(|e| fail(e.error))?;

        tracing::info!(path = %path.display(), "compiled map written");
        Ok(())
    }

    /// Serialize in section order: header, planes, entities, lights,
    /// inter-area portals, bounds, leak.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{} {}", Self::HEADER, Self::VERSION)?;
        writeln!(out)?;
        writeln!(out, "planes {}", self.planes.len())?;
        writeln!(out)?;

        for entity in &self.entities {
            write_entity(out, entity, &self.planes)?;
            writeln!(out)?;
        }

        writeln!(out, "lights {} {{", self.lights.len())?;
        for light in &self.lights {
            write!(
                out,
                "\t{} {} {} {} ",
                quoted(&light.name),
                point(&light.origin),
                Vec3(&light.color),
                Num(light.falloff)
            )?;
            match &light.shape {
                LightShape::Point { radius } => writeln!(out, "point {}", Vec3(radius))?,
                LightShape::Projected { target, right, up, start, end } => {
                    let zero = Vector3::zeros();
                    writeln!(
                        out,
                        "projected {} {} {} {} {}",
                        Vec3(target),
                        Vec3(right),
                        Vec3(up),
                        Vec3(start.as_ref().unwrap_or(&zero)),
                        Vec3(end.as_ref().unwrap_or(target))
                    )?
                },
            }
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        writeln!(out, "interAreaPortals {} {} {{", self.num_areas(), self.inter_area_portals.len())?;
        for portal in &self.inter_area_portals {
            write!(out, "\t{} {} {}", portal.winding.len(), portal.area0, portal.area1)?;
            write_points(out, &portal.winding)?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        if self.bounds.is_valid() {
            writeln!(out, "bounds {} {}", point(&self.bounds.mins), point(&self.bounds.maxs))?;
        } else {
            let origin = Point3::origin();
            writeln!(out, "bounds {} {}", point(&origin), point(&origin))?;
        }
        writeln!(out)?;

        match &self.leak {
            None => writeln!(out, "leak 0")?,
            Some(leak) => {
                write!(out, "leak 1 {} {}", leak.entity_num, leak.points.len())?;
                for p in &leak.points {
                    write!(out, " {}", point(p))?;
                }
                writeln!(out)?;
            },
        }
        Ok(())
    }
}

fn write_points<W: Write>(out: &mut W, winding: &Winding) -> io::Result<()> {
    for p in &winding.points {
        write!(out, " {}", point(p))?;
    }
    writeln!(out)
}

fn write_entity<W: Write>(out: &mut W, entity: &ProcEntity, planes: &PlaneSet) -> io::Result<()> {
    writeln!(
        out,
        "entity {} {} {} {} {{",
        entity.entity_num,
        quoted(&entity.name),
        quoted(&entity.classname),
        point(&entity.origin)
    )?;

    writeln!(out, "\tareas {}", entity.areas.len())?;
    for (area_num, area) in entity.areas.iter().enumerate() {
        writeln!(out, "\tarea {} {} {{", area_num, area.groups.len())?;
        for group in &area.groups {
            write_group(out, group)?;
        }
        writeln!(out, "\t}}")?;
    }

    write_nodes(out, entity, planes)?;

    let tree = &entity.tree;
    let portals: Vec<_> = tree
        .live_portals()
        .filter(|(_, p)| p.nodes.iter().all(|&n| n != tree.outside && !tree.nodes[n].opaque))
        .collect();
    writeln!(out, "\tportals {} {{", portals.len())?;
    for (_, portal) in portals {
        write!(out, "\t\t{} {} {}", portal.winding.len(), portal.nodes[0], portal.nodes[1])?;
        write_points(out, &portal.winding)?;
    }
    writeln!(out, "\t}}")?;
    writeln!(out, "}}")
}

/// Vertices of a group shared between its triangles, and the index list.
fn index_group(group: &OptimizeGroup) -> (Vec<MapVertex>, Vec<usize>) {
    let mut verts = Vec::new();
    let mut lookup: HashMap<[u64; 8], usize> = HashMap::new();
    let mut indexes = Vec::new();
    for tri in group.output_tris() {
        for v in &tri.v {
            let key = [
                v.pos.x, v.pos.y, v.pos.z, v.uv[0], v.uv[1], v.normal.x, v.normal.y, v.normal.z,
            ]
            .map(|c| c.to_bits() as u64);
            let index = *lookup.entry(key).or_insert_with(|| {
                verts.push(*v);
                verts.len() - 1
            });
            indexes.push(index);
        }
    }
    (verts, indexes)
}

fn write_group<W: Write>(out: &mut W, group: &OptimizeGroup) -> io::Result<()> {
    let (verts, indexes) = index_group(group);
    write!(
        out,
        "\t\tgroup {} {} {} {} {} {} (",
        quoted(&group.material),
        group.plane_num,
        group.merge_group.0,
        u8::from(group.smoothed),
        u8::from(group.optimized),
        group.lights.len()
    )?;
    for light in &group.lights {
        write!(out, " {light}")?;
    }
    writeln!(out, " ) {} {} {{", verts.len(), indexes.len())?;
    for v in &verts {
        writeln!(
            out,
            "\t\t\t( {} {} {} {} {} {} {} {} )",
            Num(v.pos.x),
            Num(v.pos.y),
            Num(v.pos.z),
            Num(v.uv[0]),
            Num(v.uv[1]),
            Num(v.normal.x),
            Num(v.normal.y),
            Num(v.normal.z)
        )?;
    }
    write!(out, "\t\t\t")?;
    for (i, index) in indexes.iter().enumerate() {
        if i > 0 {
            write!(out, " ")?;
        }
        write!(out, "{index}")?;
    }
    writeln!(out)?;
    writeln!(out, "\t\t}}")
}

/// Interior nodes in preorder. A child is a node number, `-1 - area` for an
/// empty leaf, or `0` for an opaque leaf.
fn write_nodes<W: Write>(out: &mut W, entity: &ProcEntity, planes: &PlaneSet) -> io::Result<()> {
    let tree = &entity.tree;
    let mut order: Vec<NodeId> = Vec::new();
    let mut stack = vec![tree.head];
    while let Some(node) = stack.pop() {
        if tree.nodes[node].is_leaf() {
            continue;
        }
        order.push(node);
        let [front, back] = tree.nodes[node].children;
        stack.push(back);
        stack.push(front);
    }
    let numbering: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let child = |node: NodeId| -> i64 {
        let n = &tree.nodes[node];
        match (numbering.get(&node), n.area) {
            (Some(&index), _) => index as i64,
            (None, Some(area)) if !n.opaque => -1 - area as i64,
            _ => 0,
        }
    };

    writeln!(out, "\tnodes {} {{", order.len())?;
    for &node in &order {
        let n = &tree.nodes[node];
        let Some(plane) = n.plane_num.and_then(|p| planes.get(p)) else {
            continue;
        };
        writeln!(
            out,
            "\t\t{} {} {} {}",
            Vec3(&plane.normal),
            Num(plane.w),
            child(n.children[0]),
            child(n.children[1])
        )?;
    }
    writeln!(out, "\t}}")
}
