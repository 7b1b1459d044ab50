use std::{
    collections::HashSet,
    num::NonZeroU8,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, RgbImage};
use kmeans_colors::get_kmeans;
use palette::Srgb;
use palette_common::{
    bin_common::args_helper::args,
    model::{ColorCluster, Rgb},
};

pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const DEFAULT_COLORS: NonZeroU8 = match NonZeroU8::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

args! {
    #[derive(Debug, Clone, PartialEq)]
    Palette {
        "How many dominant colors to find per frame"
        colors: NonZeroU8 = DEFAULT_COLORS;

        "Frames are shrunk to fit in a square this big before clustering"
        size: u32 = 100;

        "Seed of the cluster initialization"
        seed: u64 = 42;

        "Maximum number of k-means iterations"
        max_iter: usize = 20;

        "k-means stops when the centroids move less than this"
        converge: f32 = 0.0025;
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("failed to load the image at {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl PaletteArgs {
    /// The dominant colors of `img`, most common first. There are fewer than
    /// [`PaletteArgs::colors`] when the image doesn't have that many distinct colors.
    pub fn extract(&self, img: &RgbImage) -> Vec<ColorCluster> {
        let small;
        let img = match self.target_size(img) {
            Some((w, h)) => {
                small = image::imageops::resize(img, w, h, FilterType::Triangle);
                &small
            }
            None => img,
        };

        let pixels: Vec<Srgb> = img
            .pixels()
            .map(|p| Srgb::<u8>::new(p[0], p[1], p[2]).into_format())
            .collect();
        if pixels.is_empty() {
            return Vec::new();
        }

        let distinct = img.pixels().map(|p| p.0).collect::<HashSet<_>>().len();
        let k = usize::from(self.colors.get()).min(distinct);
        if k < usize::from(self.colors.get()) {
            log::debug!(
                "Only {} distinct colors, clustering into {} instead of {}",
                distinct,
                k,
                self.colors
            );
        }

        let result = get_kmeans(
            k,
            self.max_iter,
            self.converge,
            false,
            &pixels,
            self.seed,
        );

        let mut counts = vec![0usize; result.centroids.len()];
        for &i in &result.indices {
            counts[usize::from(i)] += 1;
        }

        let mut members: Vec<(usize, Rgb)> = result
            .centroids
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(centroid, count)| (count, to_rgb(centroid)))
            .collect();
        // stable, so ties stay in cluster order
        members.sort_by(|(a, _), (b, _)| b.cmp(a));

        let total = pixels.len() as f64;
        members
            .into_iter()
            .map(|(count, rgb)| ColorCluster {
                rgb,
                proportion: count as f64 / total,
            })
            .collect()
    }

    pub fn extract_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<ColorCluster>, ExtractError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| ExtractError::ImageLoad {
                path: path.to_owned(),
                source,
            })?
            .into_rgb8();
        Ok(self.extract(&img))
    }

    /// None if `img` already fits. Never upscales.
    fn target_size(&self, img: &RgbImage) -> Option<(u32, u32)> {
        let size = self.size.max(1);
        let (w, h) = img.dimensions();
        (w > size || h > size).then(|| (w.min(size), h.min(size)))
    }
}

fn to_rgb(centroid: &Srgb) -> Rgb {
    let channel = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(
        channel(centroid.red),
        channel(centroid.green),
        channel(centroid.blue),
    )
}
