//! Center-locked camera projection

use super::geometry::{Rect, Vec2, Viewport};

/// Camera offset for a player at `player` in a viewport of the given size.
///
/// Subtracting the offset from any world position yields its screen position;
/// the player itself always lands on the viewport center.
pub fn project(player: Vec2, viewport: Viewport) -> Vec2 {
    player - viewport.center()
}

/// World → screen for a single point
pub fn to_screen(world: Vec2, camera: Vec2) -> Vec2 {
    world - camera
}

/// World → screen for a rectangle
pub fn rect_to_screen(world: &Rect, camera: Vec2) -> Rect {
    world.translate(Vec2::new(-camera.x, -camera.y))
}

/// True if any part of `screen` falls on the viewport
pub fn is_visible(screen: &Rect, viewport: Viewport) -> bool {
    screen.intersects(&viewport.bounds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_player_minus_half_viewport() {
        let camera = project(Vec2::new(500.0, 500.0), Viewport::new(800.0, 600.0));
        assert_eq!(camera, Vec2::new(100.0, 200.0));
    }

    #[test]
    fn player_projects_to_viewport_center() {
        let viewport = Viewport::new(1024.0, 768.0);
        let player = Vec2::new(1234.5, 42.0);
        let camera = project(player, viewport);
        assert_eq!(to_screen(player, camera), viewport.center());
    }

    #[test]
    fn rect_moves_opposite_to_camera() {
        let camera = Vec2::new(100.0, 200.0);
        let screen = rect_to_screen(&Rect::new(100.0, 100.0, 64.0, 64.0), camera);
        assert_eq!(screen, Rect::new(0.0, -100.0, 64.0, 64.0));
    }

    #[test]
    fn offscreen_rects_are_culled() {
        let viewport = Viewport::new(800.0, 600.0);
        assert!(is_visible(&Rect::new(-10.0, -10.0, 20.0, 20.0), viewport));
        assert!(!is_visible(&Rect::new(-64.0, 0.0, 64.0, 64.0), viewport));
        assert!(!is_visible(&Rect::new(900.0, 100.0, 64.0, 64.0), viewport));
    }
}
