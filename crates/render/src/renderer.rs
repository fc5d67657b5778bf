use gridworld_common::{Cell, GRID_MAX, GRID_MIN, Heading};
use gridworld_kernel::{CellContents, OccupancyGrid, World};
use std::fmt::Write;

/// Which part of the grid to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderView {
    /// South-west corner, inclusive.
    pub min: Cell,
    /// North-east corner, inclusive.
    pub max: Cell,
    /// Append one line per object below the map.
    pub list_objects: bool,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            min: Cell::new(GRID_MIN, GRID_MIN),
            max: Cell::new(GRID_MAX, GRID_MAX),
            list_objects: false,
        }
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads world state and a view, then produces output. It never
/// mutates the world.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given world state and view.
    fn render(&self, world: &World, view: &RenderView) -> Self::Output;
}

/// Top-down ASCII map, north up.
///
/// `.` empty, `b` box, `#` shelf, `B` shelf holding a box. Robots are
/// `^ < v >` by heading, or `N W S E` while carrying a box.
#[derive(Debug, Default)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// The character drawn for one occupied cell.
pub fn glyph(world: &World, contents: CellContents) -> char {
    match contents {
        CellContents::Box(_) => 'b',
        CellContents::Shelf { stacked: None, .. } => '#',
        CellContents::Shelf { stacked: Some(_), .. } => 'B',
        CellContents::Robot(id) => {
            let Some(robot) = world.get(id) else {
                return '?';
            };
            match (robot.heading, robot.carried.is_some()) {
                (Heading::North, false) => '^',
                (Heading::West, false) => '<',
                (Heading::South, false) => 'v',
                (Heading::East, false) => '>',
                (Heading::North, true) => 'N',
                (Heading::West, true) => 'W',
                (Heading::South, true) => 'S',
                (Heading::East, true) => 'E',
            }
        }
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, world: &World, view: &RenderView) -> String {
        let grid = OccupancyGrid::from_world(world);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Grid (rev={}, objects={}) ===",
            world.revision(),
            world.object_count()
        );

        for z in (view.min.z..=view.max.z).rev() {
            let _ = write!(out, "{z:>4} ");
            for x in view.min.x..=view.max.x {
                let c = grid
                    .contents(Cell::new(x, z))
                    .map_or('.', |contents| glyph(world, contents));
                out.push(c);
            }
            out.push('\n');
        }

        if view.list_objects {
            for obj in world.objects().values() {
                let _ = write!(
                    out,
                    "  {:<5} [{}] cell={} elev={:.2}",
                    obj.kind.to_string(),
                    obj.id.short(),
                    obj.cell,
                    obj.elevation
                );
                if obj.is_robot() {
                    let _ = write!(out, " heading={}deg", obj.heading.degrees());
                }
                if let Some(carried) = &obj.carried {
                    let _ = write!(out, " carrying={}", carried.id.short());
                }
                out.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworld_common::ObjectKind;
    use gridworld_kernel::WorldObject;

    fn place(world: &mut World, kind: ObjectKind, x: i32, z: i32) -> gridworld_common::EntityId {
        world.insert(WorldObject::new(kind, Cell::new(x, z))).unwrap()
    }

    fn small_view() -> RenderView {
        RenderView {
            min: Cell::new(0, 0),
            max: Cell::new(2, 1),
            list_objects: false,
        }
    }

    #[test]
    fn empty_world_is_all_dots() {
        let output = TextRenderer::new().render(&World::new(), &RenderView::default());
        let rows: Vec<&str> = output.lines().skip(1).collect();
        assert_eq!(rows.len(), 20);
        assert!(rows.iter().all(|r| r.ends_with(&".".repeat(20))));
        assert!(rows[0].trim_start().starts_with("9 "));
    }

    #[test]
    fn glyphs_for_each_kind() {
        let mut world = World::new();
        place(&mut world, ObjectKind::Robot, 0, 1);
        place(&mut world, ObjectKind::Box, 1, 1);
        place(&mut world, ObjectKind::Shelf, 2, 1);
        place(&mut world, ObjectKind::Shelf, 0, 0);
        place(&mut world, ObjectKind::Box, 0, 0);

        let output = TextRenderer::new().render(&world, &small_view());
        let rows: Vec<&str> = output.lines().skip(1).collect();
        assert_eq!(rows, vec!["   1 ^b#", "   0 B.."]);
    }

    #[test]
    fn carrying_robot_is_upper_case() {
        let mut world = World::new();
        let robot = place(&mut world, ObjectKind::Robot, 1, 0);
        let item = place(&mut world, ObjectKind::Box, 1, 1);
        world.set_heading(robot, Heading::East).unwrap();
        world.pick_up(robot, item).unwrap();

        let output = TextRenderer::new().render(&world, &small_view());
        assert!(output.contains("   0 .E."));
        assert!(output.contains("   1 ..."));
    }

    #[test]
    fn object_listing_is_optional() {
        let mut world = World::new();
        place(&mut world, ObjectKind::Robot, 0, 0);
        let view = RenderView {
            list_objects: true,
            ..small_view()
        };
        let output = TextRenderer::new().render(&world, &view);
        assert!(output.contains("robot"));
        assert!(output.contains("heading=0deg"));
        assert!(!TextRenderer::new().render(&world, &small_view()).contains("heading"));
    }
}
