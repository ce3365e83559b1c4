// main.rs
//
// Compiles a small demo map: a hollow room lit by one light, optionally with
// a wall missing so the leak detector has something to find.

use clap::Parser;
use nalgebra::{Point3, Vector3};
use procmap::{CompileOptions, Compiler, DefaultMaterials, LogProgress, MapBrush, MapEntity, MapLight, Scene};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "procmap", about = "Compile a demo room into a .proc file")]
struct Args {
    /// Where to write the compiled map.
    #[arg(short, long, default_value = "room.proc")]
    output: PathBuf,
    /// Leave out the east wall.
    #[arg(long)]
    leak: bool,
    /// Skip T-junction repair and re-triangulation.
    #[arg(long)]
    no_optimize: bool,
}

/// Six 8 unit thick slabs around a 64³ interior centred on the origin.
fn room(leak: bool) -> Scene {
    let (inner, outer) = (32.0, 40.0);
    let wall = "textures/base_wall/lfwall27d";
    let mut world = MapEntity::new("worldspawn");
    for axis in 0..3 {
        for side in [-1.0, 1.0] {
            if leak && axis == 0 && side > 0.0 {
                continue;
            }
            let mut mins = Point3::new(-outer, -outer, -outer);
            let mut maxs = Point3::new(outer, outer, outer);
            if side > 0.0 {
                mins[axis] = inner;
            } else {
                maxs[axis] = -inner;
            }
            world = world.with_brush(MapBrush::from_bounds(mins, maxs, wall));
        }
    }
    Scene::new()
        .with_entity(world)
        .with_light(MapLight::point("light_1", Point3::new(0.0, 0.0, 16.0), Vector3::repeat(300.0)))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("procmap=info")))
        .init();

    let args = Args::parse();
    let options = CompileOptions::default()
        .with_optimize(!args.no_optimize)
        .with_tjunction_fix(!args.no_optimize);
    let compiler = Compiler::new(options);

    match compiler.compile_to_file(&room(args.leak), &DefaultMaterials, &mut LogProgress, &args.output) {
        Ok(output) => {
            for diagnostic in &output.diagnostics {
                println!("{diagnostic}");
            }
            println!(
                "{}: {} areas, {} triangles, {}",
                args.output.display(),
                output.proc_file.num_areas(),
                output.stats.tris_out,
                if output.proc_file.has_leak() { "LEAKED" } else { "sealed" }
            );
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}
