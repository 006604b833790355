//! Render contexts.
//!
//! A render context is an isolated surface that can load HTML, report element
//! heights once layout has settled and rasterize an element. The engine only
//! ever holds one through [`ScopedContext`], which tears it down on every exit
//! path, including early returns through `?` and panics.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::error::Result;
use crate::model::{ImageResource, PlanDocument};
use crate::paginate::{HeightMeasurer, MeasureRequest};

use super::html::HtmlRenderer;

/// An isolated rendering surface.
pub trait RenderContext {
    /// Replace the surface content with an HTML document.
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Height in CSS pixels of the element with the given id.
    ///
    /// Waits for layout to settle. Fails with
    /// [`Error::LayoutTimeout`](crate::Error::LayoutTimeout) when the element
    /// does not appear within `timeout`.
    fn measure_element(&mut self, element_id: &str, timeout: Duration) -> Result<f32>;

    /// Rasterize the element with the given id into an encoded bitmap.
    fn rasterize(&mut self, element_id: &str, scale: f32) -> Result<ImageResource>;

    /// Release the surface.
    fn teardown(&mut self) -> Result<()>;
}

/// Creates fresh render contexts.
pub trait RenderContextFactory {
    /// Context type produced by this factory.
    type Context: RenderContext;

    /// Acquire a new, empty context.
    fn acquire(&mut self) -> Result<Self::Context>;
}

/// A render context that is torn down when dropped.
pub struct ScopedContext<C: RenderContext> {
    context: C,
    released: bool,
}

impl<C: RenderContext> ScopedContext<C> {
    /// Take ownership of a context.
    pub fn new(context: C) -> Self {
        Self {
            context,
            released: false,
        }
    }

    /// Acquire a context from a factory.
    pub fn acquire<F>(factory: &mut F) -> Result<Self>
    where
        F: RenderContextFactory<Context = C>,
    {
        Ok(Self::new(factory.acquire()?))
    }

    /// Tear the context down now, reporting any teardown error.
    pub fn finish(mut self) -> Result<()> {
        self.released = true;
        self.context.teardown()
    }
}

impl<C: RenderContext> Deref for ScopedContext<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.context
    }
}

impl<C: RenderContext> DerefMut for ScopedContext<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<C: RenderContext> Drop for ScopedContext<C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.context.teardown() {
            log::warn!("render context teardown failed: {}", e);
        }
    }
}

/// Measures items by rendering the measurement document into a context.
pub struct ContextMeasurer<'a, C: RenderContext + ?Sized> {
    context: &'a mut C,
    renderer: &'a HtmlRenderer,
    timeout: Duration,
}

impl<'a, C: RenderContext + ?Sized> ContextMeasurer<'a, C> {
    /// Create a measurer over a context.
    pub fn new(context: &'a mut C, renderer: &'a HtmlRenderer, timeout: Duration) -> Self {
        Self {
            context,
            renderer,
            timeout,
        }
    }
}

impl<C: RenderContext + ?Sized> HeightMeasurer for ContextMeasurer<'_, C> {
    fn begin(&mut self, doc: &PlanDocument) -> Result<()> {
        self.context
            .load_html(&self.renderer.measurement_document(doc))
    }

    fn measure(&mut self, request: &MeasureRequest<'_>) -> Result<f32> {
        self.context
            .measure_element(&request.element_id(), self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingContext {
        teardowns: Rc<Cell<u32>>,
    }

    impl RenderContext for CountingContext {
        fn load_html(&mut self, _html: &str) -> Result<()> {
            Ok(())
        }

        fn measure_element(&mut self, element_id: &str, timeout: Duration) -> Result<f32> {
            Err(Error::LayoutTimeout {
                element: element_id.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }

        fn rasterize(&mut self, _element_id: &str, _scale: f32) -> Result<ImageResource> {
            Err(Error::Render("no raster".into()))
        }

        fn teardown(&mut self) -> Result<()> {
            self.teardowns.set(self.teardowns.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_teardown_on_drop() {
        let teardowns = Rc::new(Cell::new(0));
        {
            let _ctx = ScopedContext::new(CountingContext {
                teardowns: teardowns.clone(),
            });
        }
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn test_finish_tears_down_once() {
        let teardowns = Rc::new(Cell::new(0));
        let ctx = ScopedContext::new(CountingContext {
            teardowns: teardowns.clone(),
        });
        ctx.finish().unwrap();
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn test_teardown_on_error_path() {
        fn failing(teardowns: Rc<Cell<u32>>) -> Result<f32> {
            let mut ctx = ScopedContext::new(CountingContext { teardowns });
            let height = ctx.measure_element("item-0-0", Duration::from_millis(5))?;
            ctx.finish()?;
            Ok(height)
        }

        let teardowns = Rc::new(Cell::new(0));
        let err = failing(teardowns.clone()).unwrap_err();
        assert!(matches!(err, Error::LayoutTimeout { waited_ms: 5, .. }));
        assert_eq!(teardowns.get(), 1);
    }
}
