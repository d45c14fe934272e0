//! Renders a procedural torus as ASCII art, tracing each character's ray
//! through both the binary BVH and the CWBVH.
//!
//! Run with `RUST_LOG=info` to see build logs.

use std::f32::consts::TAU;

use cwbvh::gpu::BVH_FAR;
use cwbvh::BvhRegistry;
use glam::{vec3, Vec3, Vec4};

const WIDTH: usize = 72;
const HEIGHT: usize = 32;
const SHADES: &[u8] = b"@%#*+=-:. ";

fn main() {
    env_logger::init();

    let vertices = torus(1.0, 0.4, 48, 24);
    let triangle_count = vertices.len() / 3;
    let registry = BvhRegistry::new();

    let handle = match registry.build(&vertices, triangle_count, true) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("couldn't build BVH: {err}");
            return;
        }
    };

    let bvh = registry.get(handle).expect("handle was just built");

    if let Some(cwbvh) = bvh.cwbvh() {
        let stats = cwbvh.validate();

        println!(
            "triangles = {}, cwbvh nodes = {}, leaves = {}, depth = {}",
            triangle_count, stats.node_count, stats.leaf_count, stats.max_depth
        );
    }

    for use_cwbvh in [false, true] {
        let mut steps = 0;
        let eye = vec3(0.0, 1.6, 3.2);
        let forward = (Vec3::ZERO - eye).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        println!();
        println!("{}", if use_cwbvh { "CWBVH" } else { "BVH" });

        for y in 0..HEIGHT {
            let line: String = (0..WIDTH)
                .map(|x| {
                    let u = (x as f32 / WIDTH as f32) * 2.0 - 1.0;
                    let v = 1.0 - (y as f32 / HEIGHT as f32) * 2.0;
                    let dir = forward + right * u * 1.1 + up * v * 0.7;

                    let hit = registry.intersect(handle, eye, dir, use_cwbvh);

                    steps += hit.steps as usize;

                    shade(hit.t)
                })
                .collect();

            println!("{line}");
        }

        println!(
            "avg. steps per ray = {:.2}",
            steps as f32 / (WIDTH * HEIGHT) as f32
        );
    }

    registry.destroy(handle);
}

fn shade(t: f32) -> char {
    if t >= BVH_FAR {
        return ' ';
    }

    let depth = ((t - 2.0) / 2.5).clamp(0.0, 0.999);

    SHADES[(depth * (SHADES.len() - 1) as f32) as usize] as char
}

fn torus(
    major: f32,
    minor: f32,
    major_segments: usize,
    minor_segments: usize,
) -> Vec<Vec4> {
    let point = |i: usize, j: usize| {
        let a = TAU * (i % major_segments) as f32 / major_segments as f32;
        let b = TAU * (j % minor_segments) as f32 / minor_segments as f32;
        let r = major + minor * b.cos();

        Vec4::new(r * a.cos(), minor * b.sin(), r * a.sin(), 0.0)
    };

    let mut vertices = Vec::new();

    for i in 0..major_segments {
        for j in 0..minor_segments {
            let p00 = point(i, j);
            let p10 = point(i + 1, j);
            let p01 = point(i, j + 1);
            let p11 = point(i + 1, j + 1);

            vertices.extend([p00, p10, p11, p00, p11, p01]);
        }
    }

    vertices
}
