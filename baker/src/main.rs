use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use baker::{meshlets::MeshletParams, BakeConfig, Escalation};
use clap::Parser;
use common::{Asset, TriMesh};
use glam::Vec3;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Bake meshes into meshlet LOD hierarchies.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input files or glob patterns (.glb, .gltf, .obj)
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory to write `<stem>.meshlets.bin` files into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// glTF mesh to load
    #[arg(long, default_value_t = 0)]
    mesh: usize,

    /// glTF primitive within the mesh
    #[arg(long, default_value_t = 0)]
    primitive: usize,

    #[arg(long, default_value_t = 4)]
    meshlets_per_group: usize,

    #[arg(long, default_value_t = 32)]
    max_steps: usize,

    /// 0 keeps every level
    #[arg(long, default_value_t = 0)]
    max_level_count: usize,

    #[arg(long, default_value_t = 0.01)]
    target_error: f32,

    #[arg(long, default_value_t = 0.001)]
    target_error_sloppy: f32,

    #[arg(long, default_value_t = 0.8)]
    min_triangle_reduction: f32,

    #[arg(long, default_value_t = 0.5)]
    simplify_target_ratio: f32,

    #[arg(long, default_value_t = 1e-4)]
    min_simplification_error: f32,

    #[arg(long, default_value_t = 1e-4)]
    bounds_epsilon: f32,

    #[arg(long, value_enum, default_value_t = Escalation::PerLevel)]
    escalation: Escalation,

    /// Reorder source triangles for the vertex cache before clustering
    #[arg(long)]
    optimize_vertex_cache: bool,

    #[arg(long, default_value_t = 128 * 128)]
    max_lod_nodes: usize,

    #[arg(long, default_value_t = 128)]
    max_meshlet_vertices: usize,

    #[arg(long, default_value_t = 128)]
    max_meshlet_triangles: usize,

    #[arg(long, default_value_t = 0.25)]
    cone_weight: f32,

    /// Check the finished hierarchy and fail on any issue
    #[arg(long)]
    validate: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> BakeConfig {
        BakeConfig {
            meshlets_per_group: self.meshlets_per_group,
            max_steps: self.max_steps,
            max_level_count: self.max_level_count,
            target_error: self.target_error,
            target_error_sloppy: self.target_error_sloppy,
            min_triangle_reduction_per_step: self.min_triangle_reduction,
            simplify_target_ratio: self.simplify_target_ratio,
            min_simplification_error: self.min_simplification_error,
            bounds_epsilon: self.bounds_epsilon,
            escalation: self.escalation,
            optimize_vertex_cache: self.optimize_vertex_cache,
            max_lod_nodes: self.max_lod_nodes,
            meshlet: MeshletParams {
                max_vertices: self.max_meshlet_vertices,
                max_triangles: self.max_meshlet_triangles,
                cone_weight: self.cone_weight,
            },
            validate: self.validate,
        }
    }
}

fn load_obj(path: &Path) -> Result<TriMesh> {
    let obj = obj::Obj::load(path).with_context(|| format!("Failed to load {path:?}"))?;

    let positions = obj.data.position.iter().map(|&p| Vec3::from(p)).collect();

    let mut indices = Vec::new();
    for group in obj.data.objects.iter().flat_map(|o| &o.groups) {
        for poly in &group.polys {
            // Fan out polygons
            for i in 2..poly.0.len() {
                indices.extend([poly.0[0].0, poly.0[i - 1].0, poly.0[i].0].map(|v| v as u32));
            }
        }
    }

    Ok(TriMesh::from_positions(positions, indices)?)
}

fn load(path: &Path, cli: &Cli) -> Result<TriMesh> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("glb" | "gltf") => TriMesh::from_gltf(path, cli.mesh, cli.primitive)
            .with_context(|| format!("Failed to load {path:?}")),
        Some("obj") => load_obj(path),
        _ => bail!("Unsupported mesh format {path:?}"),
    }
}

fn bake_file(path: &Path, cli: &Cli, config: &BakeConfig) -> Result<PathBuf> {
    let mesh = load(path, cli)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Input has no file name")?;

    let output = baker::bake(&mesh, stem.to_owned(), config)
        .with_context(|| format!("Failed to bake {path:?}"))?;

    if !output.issues.is_empty() {
        bail!(
            "{path:?} failed validation with {} issues, first: {}",
            output.issues.len(),
            output.issues[0]
        );
    }

    let c = &output.collection;
    log::info!(
        "{stem}: {} levels, {} nodes, {} triangles at the root, {} at the leaves",
        c.level_count,
        c.nodes.len(),
        c.level_triangle_count(0),
        c.level_triangle_count(c.level_count as usize - 1),
    );

    let out = cli.output_dir.join(format!("{stem}.meshlets.bin"));
    c.save(&out)
        .with_context(|| format!("Failed to write {out:?}"))?;

    Ok(out)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = cli.config();
    config.validate()?;

    let mut paths = Vec::new();
    for pattern in &cli.inputs {
        for entry in glob::glob(pattern).with_context(|| format!("Bad pattern {pattern}"))? {
            paths.push(entry?);
        }
    }
    if paths.is_empty() {
        bail!("No input files matched");
    }

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {:?}", cli.output_dir))?;

    let bar = indicatif::ProgressBar::new(paths.len() as u64);
    let mut failed = 0;

    for path in &paths {
        bar.set_message(path.display().to_string());

        match bake_file(path, &cli, &config) {
            Ok(out) => log::info!("Wrote {out:?}"),
            Err(e) => {
                log::error!("{e:#}");
                failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish();

    if failed > 0 {
        bail!("{failed} of {} inputs failed", paths.len());
    }
    Ok(())
}
