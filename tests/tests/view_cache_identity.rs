//! spec.md §8 property 6: `texture.create_view(d)` called twice with
//! equal `d` returns handles referring to the same underlying native
//! view.

use gfx_core::texture::{Texture, TextureDescriptor, TextureViewDescriptor};
use types::{Extent3d, SubresourceRange, TextureDimension, TextureFormat, TextureUsage, TextureViewDimension};

#[test]
fn repeated_view_descriptor_returns_the_same_native_view() {
    tests::skip_without_device!(device);

    let texture = device
        .create_texture(&TextureDescriptor {
            label: None,
            size: Extent3d { width: 4, height: 4, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })
        .expect("create texture");

    let desc = TextureViewDescriptor {
        format: TextureFormat::Rgba8Unorm,
        dimension: TextureViewDimension::D2,
        range: SubresourceRange::default(),
    };

    let a = Texture::create_view(&texture, desc.clone()).expect("first view");
    let b = Texture::create_view(&texture, desc).expect("second view");

    assert_eq!(a.borrow().raw(), b.borrow().raw());
}
