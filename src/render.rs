//! Rendering collaborator interface
//!
//! The auto-layout engine decides; a [`Renderer`] draws. Handles are plain
//! ids so implementations can keep their own state tables. The crate ships
//! a terminal implementation used by the CLI to show what would be drawn;
//! real plotting backends implement the same trait.

use crate::errors::Result;
use crate::layout::GridShape;
use crate::store::JsonMap;
use ndarray::ArrayView2;

/// Handle to a created figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureId(pub usize);

/// Handle to one grid cell's plotting surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisId(pub usize);

/// Handle to a drawn mesh image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

/// Handle to a drawn line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub usize);

/// Abstract plotting backend consumed by the auto-layout engine
pub trait Renderer {
    /// Create a figure with one axis per active grid cell, returned in
    /// row-major cell order
    fn create_grid(
        &mut self,
        shape: &GridShape,
        width: f64,
        height: f64,
    ) -> Result<(FigureId, Vec<AxisId>)>;

    /// Draw a 1-D line; style keys are backend-specific and pass through
    fn draw_line(&mut self, axis: AxisId, x: &[f64], y: &[f64], style: &JsonMap) -> Result<LineId>;

    /// Draw a 2-D pseudocolor mesh; `values` has shape `[y.len(), x.len()]`
    fn draw_mesh(
        &mut self,
        axis: AxisId,
        x: &[f64],
        y: &[f64],
        values: ArrayView2<'_, f64>,
        style: &JsonMap,
    ) -> Result<ImageId>;

    /// Attach a labeled colorbar to a drawn mesh
    fn attach_colorbar(
        &mut self,
        axis: AxisId,
        image: ImageId,
        label: &str,
        style: &JsonMap,
    ) -> Result<()>;

    fn set_axis_labels(&mut self, axis: AxisId, x_label: &str, y_label: &str) -> Result<()>;

    fn set_axis_title(&mut self, axis: AxisId, title: &str) -> Result<()>;

    fn set_figure_title(&mut self, figure: FigureId, title: &str) -> Result<()>;

    fn set_minor_ticks(&mut self, axis: AxisId, subdivisions: u32) -> Result<()>;
}

/// Terminal renderer: prints every drawing call instead of plotting
#[derive(Debug, Default)]
pub struct TextRenderer {
    figures: usize,
    axes: usize,
    images: usize,
    lines: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for TextRenderer {
    fn create_grid(
        &mut self,
        shape: &GridShape,
        width: f64,
        height: f64,
    ) -> Result<(FigureId, Vec<AxisId>)> {
        let figure = FigureId(self.figures);
        self.figures += 1;
        let mut axes = Vec::with_capacity(shape.cell_count());
        for _ in 0..shape.cell_count() {
            axes.push(AxisId(self.axes));
            self.axes += 1;
        }
        println!(
            "figure {}: {} x {} grid ({:.1} x {:.1}), {} axis(es)",
            figure.0,
            shape.n_rows(),
            shape.n_cols(),
            width,
            height,
            axes.len()
        );
        Ok((figure, axes))
    }

    fn draw_line(&mut self, axis: AxisId, x: &[f64], y: &[f64], _style: &JsonMap) -> Result<LineId> {
        let line = LineId(self.lines);
        self.lines += 1;
        println!("  axis {}: line with {} point(s) (x[0]={:?}, y[0]={:?})",
            axis.0,
            x.len(),
            x.first(),
            y.first()
        );
        Ok(line)
    }

    fn draw_mesh(
        &mut self,
        axis: AxisId,
        x: &[f64],
        y: &[f64],
        _values: ArrayView2<'_, f64>,
        _style: &JsonMap,
    ) -> Result<ImageId> {
        let image = ImageId(self.images);
        self.images += 1;
        println!(
            "  axis {}: mesh {} x {} cell(s)",
            axis.0,
            y.len(),
            x.len()
        );
        Ok(image)
    }

    fn attach_colorbar(
        &mut self,
        axis: AxisId,
        _image: ImageId,
        label: &str,
        _style: &JsonMap,
    ) -> Result<()> {
        println!("  axis {}: colorbar '{}'", axis.0, label);
        Ok(())
    }

    fn set_axis_labels(&mut self, axis: AxisId, x_label: &str, y_label: &str) -> Result<()> {
        println!("  axis {}: x='{}' y='{}'", axis.0, x_label, y_label);
        Ok(())
    }

    fn set_axis_title(&mut self, axis: AxisId, title: &str) -> Result<()> {
        println!("  axis {}: title '{}'", axis.0, title);
        Ok(())
    }

    fn set_figure_title(&mut self, figure: FigureId, title: &str) -> Result<()> {
        println!("figure {}: title '{}'", figure.0, title);
        Ok(())
    }

    fn set_minor_ticks(&mut self, _axis: AxisId, _subdivisions: u32) -> Result<()> {
        Ok(())
    }
}
