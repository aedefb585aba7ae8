use crate::types::ResourceId;

/// One indexed draw of a procedural mesh.
///
/// All fields reference resources by id; the resource manager keeps ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub pipeline: ResourceId,
    pub vertex_buffer: ResourceId,
    pub index_buffer: ResourceId,
    pub index_count: u32,
    pub uniforms: ResourceId,
    pub texture: ResourceId,
}

impl DrawCommand {
    /// Every resource this draw reads.
    pub fn resources(&self) -> [ResourceId; 5] {
        [
            self.pipeline,
            self.vertex_buffer,
            self.index_buffer,
            self.uniforms,
            self.texture,
        ]
    }
}

/// Commands recorded for one frame: a clear followed by draws.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandList {
    pub clear_color: [f32; 4],
    pub draws: Vec<DrawCommand>,
}

impl CommandList {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self {
            clear_color,
            draws: Vec::new(),
        }
    }

    pub fn push(&mut self, draw: DrawCommand) {
        self.draws.push(draw);
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Iterate all resource ids referenced by the recorded draws.
    pub fn referenced_resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.draws.iter().flat_map(|d| d.resources())
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0, 1.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(base: u64) -> DrawCommand {
        DrawCommand {
            pipeline: ResourceId(base),
            vertex_buffer: ResourceId(base + 1),
            index_buffer: ResourceId(base + 2),
            index_count: 6,
            uniforms: ResourceId(base + 3),
            texture: ResourceId(base + 4),
        }
    }

    #[test]
    fn empty_list_has_no_references() {
        let list = CommandList::default();
        assert!(list.is_empty());
        assert_eq!(list.referenced_resources().count(), 0);
    }

    #[test]
    fn referenced_resources_cover_all_draws() {
        let mut list = CommandList::new([0.1, 0.1, 0.15, 1.0]);
        list.push(draw(0));
        list.push(draw(10));
        let ids: Vec<ResourceId> = list.referenced_resources().collect();
        assert_eq!(ids.len(), 10);
        assert!(ids.contains(&ResourceId(14)));
    }
}
