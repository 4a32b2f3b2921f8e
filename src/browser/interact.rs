//! Replay of interaction plans over CDP input events

use anyhow::Result;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType,
};
use tracing::trace;

use crate::pacing::{PointerPlan, ScrollPlan, TypingPlan};

/// Move the pointer through every step of `plan`
pub async fn replay_pointer(page: &Page, plan: &PointerPlan) -> Result<()> {
    for step in &plan.steps {
        page.execute(
            DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MouseMoved)
                .x(step.x)
                .y(step.y)
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await?;
        tokio::time::sleep(step.delay).await;
    }
    trace!(steps = plan.steps.len(), "pointer plan replayed");
    Ok(())
}

/// Scroll the window through every burst of `plan`
pub async fn replay_scroll(page: &Page, plan: &ScrollPlan) -> Result<()> {
    for step in &plan.steps {
        let script = format!("window.scrollBy(0, {})", step.delta_y);
        page.evaluate(script.as_str()).await?;
        tokio::time::sleep(step.pause).await;
    }
    trace!(steps = plan.steps.len(), "scroll plan replayed");
    Ok(())
}

/// Type `plan` into whatever element has focus
pub async fn replay_typing(page: &Page, plan: &TypingPlan) -> Result<()> {
    for keystroke in &plan.keystrokes {
        tokio::time::sleep(keystroke.delay).await;
        page.execute(
            DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(keystroke.ch.to_string())
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await?;
    }
    trace!(chars = plan.keystrokes.len(), "typing plan replayed");
    Ok(())
}
