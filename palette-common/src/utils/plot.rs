use color_eyre::eyre;
use plotters::prelude::*;
use std::path::Path;

use crate::model::ColorCluster;

/// One bar per cluster, as tall as its proportion and painted in its color. There is no
/// text in it, so no fonts are needed.
pub fn palette_chart<P>(path: P, clusters: &[ColorCluster]) -> eyre::Result<()>
where
    P: AsRef<Path>,
{
    eyre::ensure!(!clusters.is_empty(), "there are no colors to plot");
    let width = 100 + 100 * clusters.len();
    let max_val = clusters
        .iter()
        .map(|c| c.proportion)
        .fold(0.0_f64, f64::max);

    let root = SVGBackend::new(&path, (width as u32, 300)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(5)
        .build_cartesian_2d(0.0..clusters.len() as f64, 0.0..max_val)?;

    chart.draw_series(clusters.iter().enumerate().map(|(i, cluster)| {
        let [r, g, b] = cluster.rgb.0;
        Rectangle::new(
            [(i as f64, 0.0), (i as f64 + 1.0, cluster.proportion)],
            RGBColor(r, g, b).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Vertical bars between 0 and 1, labeled with the `X`s.
pub fn unit_bar_chart<X, P>(path: P, y_desc: &str, bars: &[(X, f64)]) -> eyre::Result<()>
where
    P: AsRef<Path>,
    X: ToString,
{
    eyre::ensure!(!bars.is_empty(), "there are no bars to plot");
    let width = 100 + 60 * bars.len();

    let root = SVGBackend::new(&path, (width as u32, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(5)
        .set_left_and_bottom_label_area_size(40)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..1.0)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|i: &SegmentValue<usize>| match i {
            SegmentValue::CenterOf(i) => {
                bars.get(*i).map(|(x, _)| x.to_string()).unwrap_or_default()
            }
            SegmentValue::Exact(_) | SegmentValue::Last => String::new(),
        })
        .x_labels(bars.len())
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(10)
            .data(bars.iter().enumerate().map(|(i, (_, h))| (i, *h))),
    )?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Rgb;

    #[test]
    fn writes_palette_svg() {
        let tmp = tempfile::tempdir().unwrap();

        let palette = tmp.path().join("palette.svg");
        let clusters = [
            ColorCluster {
                rgb: Rgb::new(255, 0, 0),
                proportion: 0.75,
            },
            ColorCluster {
                rgb: Rgb::new(0, 0, 255),
                proportion: 0.25,
            },
        ];
        palette_chart(&palette, &clusters).unwrap();
        let svg = std::fs::read_to_string(&palette).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.to_ascii_uppercase().contains("#FF0000"));
    }

    #[test]
    fn nothing_to_plot() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(palette_chart(tmp.path().join("a.svg"), &[]).is_err());
        assert!(unit_bar_chart::<&str, _>(tmp.path().join("b.svg"), "y", &[]).is_err());
    }
}
