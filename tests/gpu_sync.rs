/// GPU integration tests: shapes are drawn into an offscreen texture which is then downloaded
/// and checked pixel by pixel.
///
/// Every test returns early when the machine has no usable adapter.
///
/// Run with:   cargo test --test gpu_sync
use futures::executor::block_on;
use std::sync::Arc;
use vecshape::lyon::math::{point, Size};
use vecshape::wgpu;
use vecshape::{
    Color, ContextOptions, GlTransform, Image, RenderContext, Shader, ShaderError, Shape,
    Texture, TextureError, UniformKind,
};

const TARGET_SIZE: u32 = 16;

fn context() -> Option<RenderContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = block_on(RenderContext::try_new_headless(ContextOptions::default()));
    if ctx.is_none() {
        eprintln!("No GPU adapter available, skipping");
    }
    ctx
}

/// Clears `target` to opaque black, renders every shape once and returns what each `render`
/// call reported.
fn draw(
    ctx: &RenderContext,
    target: &Texture,
    shader: &Shader,
    shapes: &mut [&mut Shape],
    transform: &GlTransform,
) -> Vec<bool> {
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gpu_sync_test_encoder"),
        });

    let drawn: Vec<bool> = {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gpu_sync_test_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        shapes
            .iter_mut()
            .map(|shape| shape.render(ctx, &mut pass, shader, transform))
            .collect()
    };

    ctx.queue().submit(std::iter::once(encoder.finish()));
    drawn
}

fn assert_pixel(image: &Image, x: usize, y: usize, expected: Color) {
    let actual = image.pixel(x, y).unwrap();
    for (a, e) in actual.0.iter().zip(expected.0.iter()) {
        assert!(
            (a - e).abs() < 0.02,
            "pixel ({x}, {y}) is {actual:?}, expected {expected:?}"
        );
    }
}

#[test]
fn rectangle_covers_left_half() {
    let Some(ctx) = context() else {
        return;
    };
    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let shader = Shader::new(&ctx);

    let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(0.5, 1.0)).unwrap();
    shape.set_color(Color::rgb(1.0, 0.0, 0.0));

    let drawn = draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_eq!(drawn, vec![true]);
    assert!(shape.buffer_sync().has_gpu_buffers());
    assert!(!shape.dirty().any());

    let image = target.download(&ctx).unwrap();
    assert_eq!(image.size(), (TARGET_SIZE as usize, TARGET_SIZE as usize));
    assert_pixel(&image, 2, 8, Color::rgb(1.0, 0.0, 0.0));
    assert_pixel(&image, 13, 8, Color::BLACK);
}

#[test]
fn vertex_color_edit_shows_after_next_draw() {
    let Some(ctx) = context() else {
        return;
    };
    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let shader = Shader::new(&ctx);

    let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
    draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_pixel(&target.download(&ctx).unwrap(), 8, 8, Color::WHITE);

    for i in 0..shape.n_vertices() {
        shape.set_vertex_color(i, Color::rgb(0.0, 0.0, 1.0)).unwrap();
    }
    assert!(shape.dirty().color);
    draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_pixel(&target.download(&ctx).unwrap(), 8, 8, Color::rgb(0.0, 0.0, 1.0));
}

#[test]
fn invisible_shape_does_no_gpu_work() {
    let Some(ctx) = context() else {
        return;
    };
    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let shader = Shader::new(&ctx);

    let mut shape = Shape::circle(point(0.5, 0.5), 0.5, 32).unwrap();
    shape.set_visible(false);

    let drawn = draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_eq!(drawn, vec![false]);
    assert!(!shape.buffer_sync().has_gpu_buffers());
    assert!(shape.dirty().any());
    assert_pixel(&target.download(&ctx).unwrap(), 8, 8, Color::BLACK);
}

#[test]
fn transform_moves_the_shape() {
    let Some(ctx) = context() else {
        return;
    };
    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let shader = Shader::new(&ctx);

    let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(0.5, 1.0)).unwrap();
    let transform = GlTransform::identity().then_translate(0.5, 0.0);
    draw(&ctx, &target, &shader, &mut [&mut shape], &transform);

    let image = target.download(&ctx).unwrap();
    assert_pixel(&image, 2, 8, Color::BLACK);
    assert_pixel(&image, 13, 8, Color::WHITE);
}

#[test]
fn textured_shape_samples_the_texture() {
    let Some(ctx) = context() else {
        return;
    };
    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let shader = Shader::new(&ctx);

    let green = Image::create(4, 4, Color::rgb(0.0, 1.0, 0.0));
    let texture = Arc::new(Texture::from_image(&ctx, &green).unwrap());

    let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
    shape.set_texture(Some(texture.clone()));
    draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_pixel(&target.download(&ctx).unwrap(), 8, 8, Color::rgb(0.0, 1.0, 0.0));
}

#[test]
fn texture_download_returns_uploaded_pixels() {
    let Some(ctx) = context() else {
        return;
    };
    let mut image = Image::create(3, 2, Color::BLACK);
    image.set_pixel(2, 1, Color::rgb(1.0, 0.0, 0.0)).unwrap();
    image.set_pixel(0, 1, Color::rgba(0.0, 0.0, 1.0, 0.0)).unwrap();

    let texture = Texture::from_image(&ctx, &image).unwrap();
    assert_eq!(texture.size(), (3, 2));
    assert_eq!(texture.download(&ctx).unwrap(), image);
}

#[test]
fn zero_sized_texture_is_rejected() {
    let Some(ctx) = context() else {
        return;
    };
    assert!(Texture::create(&ctx, 0, 4).is_err());
    assert!(Texture::from_image(&ctx, &Image::default()).is_err());
}

#[test]
fn oversized_texture_is_rejected() {
    let Some(ctx) = context() else {
        return;
    };
    let max = ctx.device().limits().max_texture_dimension_2d;
    assert!(matches!(
        Texture::create(&ctx, max.saturating_add(1), 1),
        Err(TextureError::TooLarge { .. })
    ));
    assert!(Texture::create(&ctx, max, 1).is_ok());
}

#[test]
fn custom_shader_uniforms() {
    let Some(ctx) = context() else {
        return;
    };
    let source = r#"
struct ShapeUniforms {
    transform: mat4x4<f32>,
    color: vec4<f32>,
};
@group(0) @binding(0) var<uniform> shape: ShapeUniforms;

struct Params {
    strength: f32,
    tint: vec4<f32>,
};
@group(2) @binding(0) var<uniform> params: Params;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    let p = shape.transform * vec4<f32>(position, 1.0);
    return vec4<f32>(p.x * 2.0 - 1.0, 1.0 - p.y * 2.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return params.tint * params.strength;
}
"#;
    let mut shader = block_on(Shader::from_wgsl(
        &ctx,
        source,
        &[("strength", UniformKind::Float), ("tint", UniformKind::Vec4)],
    ))
    .unwrap();

    assert_eq!(
        shader.set_uniform_int("strength", 1),
        Err(ShaderError::UniformKindMismatch {
            name: "strength".to_string(),
            declared: UniformKind::Float,
            given: UniformKind::Int,
        })
    );
    assert_eq!(
        shader.set_uniform_float("missing", 1.0),
        Err(ShaderError::UnknownUniform("missing".to_string()))
    );
    shader.set_uniform_float("strength", 1.0).unwrap();
    shader.set_uniform_vec4("tint", [1.0, 1.0, 0.0, 1.0]).unwrap();

    let target = Texture::create(&ctx, TARGET_SIZE, TARGET_SIZE).unwrap();
    let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
    draw(&ctx, &target, &shader, &mut [&mut shape], &GlTransform::identity());
    assert_pixel(&target.download(&ctx).unwrap(), 8, 8, Color::rgb(1.0, 1.0, 0.0));
}

#[test]
fn invalid_wgsl_is_reported() {
    let Some(ctx) = context() else {
        return;
    };
    let result = block_on(Shader::from_wgsl(&ctx, "fn vs_main( {", &[]));
    assert!(matches!(result, Err(ShaderError::Compilation(_))));
}
