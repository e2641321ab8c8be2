use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use atlas_baker::config::{CliArgs, JobConfig};
use atlas_baker::{baking, ingestion, output};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("atlas_baker=debug")
    } else {
        EnvFilter::new("atlas_baker=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = JobConfig::try_from(args).context("invalid arguments")?;

    // Configure rayon thread pool
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    let scene = ingestion::ingest(&config.input).context("ingestion failed")?;

    if config.dry_run {
        let stats = ingestion::compute_stats(&scene);
        println!(
            "{} nodes, {} submeshes, {} vertices, {} triangles",
            stats.node_count, stats.submesh_count, stats.total_vertices, stats.total_triangles
        );
        println!(
            "{} materials ({} textured), {} textures, normals: {}, uvs: {}",
            stats.material_count,
            stats.textured_material_count,
            stats.texture_count,
            stats.has_normals,
            stats.has_uvs
        );
        return Ok(());
    }

    match baking::bake(&scene, &config.bake) {
        Ok(report) => {
            output::write_outputs(&report, &config.output).context("writing outputs failed")?;
            for log in &report.logs {
                println!("[{:?}] {}", log.level, log.message);
            }
            match &report.artifacts {
                Some(artifacts) => println!(
                    "Done: {} vertices, {} triangles, {}px atlas x{} channels",
                    artifacts.mesh.vertex_count(),
                    artifacts.mesh.triangle_count(),
                    artifacts.layout.size,
                    artifacts.atlases.len()
                ),
                None => println!("Bake aborted: merged mesh has no UVs"),
            }
            Ok(())
        }
        Err(e) => {
            error!(%e, "Bake failed");
            Err(anyhow::anyhow!(e)).context("atlas bake failed")
        }
    }
}
