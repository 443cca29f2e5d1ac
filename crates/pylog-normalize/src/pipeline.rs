use pylog_types::Transform;

/// Ordered chain of transforms applied to every chunk
#[derive(Default)]
pub struct Pipeline<'a> {
    stages: Vec<Box<dyn Transform + Send + 'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain
    pub fn stage(mut self, transform: impl Transform + Send + 'a) -> Self {
        self.stages.push(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Transform for Pipeline<'_> {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut stages = self.stages.iter_mut();
        let Some(first) = stages.next() else {
            return chunk.to_vec();
        };

        let mut data = first.process(chunk);
        for stage in stages {
            data = stage.process(&data);
        }
        data
    }

    fn finish(&mut self) -> Vec<u8> {
        // Residue from each stage still has to pass through the later ones
        let mut pending = Vec::new();
        for stage in self.stages.iter_mut() {
            let mut out = if pending.is_empty() {
                Vec::new()
            } else {
                stage.process(&pending)
            };
            out.extend(stage.finish());
            pending = out;
        }
        pending
    }
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LevelNormalizer, NormalizerOptions};
    use pylog_types::LevelMapping;

    /// Holds everything until the end of input
    struct Hold(Vec<u8>);

    impl Transform for Hold {
        fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
            self.0.extend_from_slice(chunk);
            Vec::new()
        }

        fn finish(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.0)
        }
    }

    struct Upper;

    impl Transform for Upper {
        fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
            chunk.to_ascii_uppercase()
        }

        fn finish(&mut self) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.process(b"abc"), b"abc");
        assert!(pipeline.finish().is_empty());
    }

    #[test]
    fn test_stages_run_in_order() {
        let normalizer = LevelNormalizer::new(LevelMapping::python(), NormalizerOptions::default());
        let mut pipeline = Pipeline::new().stage(normalizer).stage(Upper);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.process(b"{\"levelname\":\"INFO\",\"msg\":\"hi\"}"),
            b"{\"LEVEL\":30,\"MSG\":\"HI\"}"
        );
    }

    #[test]
    fn test_finish_drains_residue_through_later_stages() {
        let normalizer = LevelNormalizer::new(LevelMapping::python(), NormalizerOptions::default());
        let mut pipeline = Pipeline::new().stage(normalizer).stage(Hold(Vec::new())).stage(Upper);

        assert!(pipeline.process(b"{\"a\":\"b\"}{\"levelname\":\"IN").is_empty());
        assert_eq!(pipeline.finish(), b"{\"A\":\"B\"}{\"LEVELNAME\":\"IN");
    }
}
