use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::weight_init::WeightInit;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::Layer;

const EPS: f32 = 1e-3;

/// Distinct values at least 0.05 apart, none of them zero, in shuffled order.
pub(crate) fn spaced_input(desc: TensorDesc, seed: u64) -> Tensor {
    let n = desc.num_elements();
    let mut values: Vec<f32> = (0..n).map(|i| (i as f32 - n as f32 / 2.0) * 0.05 + 0.025).collect();
    values.shuffle(&mut StdRng::seed_from_u64(seed));
    Tensor::new(desc, values).unwrap()
}

fn projected_loss(layer: &dyn Layer, input: &Tensor, projection: &Tensor) -> f32 {
    let out = layer.forward(input).unwrap();
    out.data().iter().zip(projection.data()).map(|(a, b)| a * b).sum()
}

fn assert_close(numeric: f32, analytic: f32, what: &str) {
    assert!(
        (numeric - analytic).abs() <= 1e-2 * (1.0 + analytic.abs()),
        "{what}: numeric {numeric} vs analytic {analytic}"
    );
}

/// Compares `backward` against central differences of `sum(forward(x) * r)`.
pub(crate) fn check_gradients(layer: &mut dyn Layer, input_desc: TensorDesc) {
    let mut rng = StdRng::seed_from_u64(42);
    for param in layer.parameters_mut() {
        let shape = param.desc().to_dims();
        let values = WeightInit::UniformRandom { min: -0.5, max: 0.5 }.init(&shape, &mut rng);
        param.data_mut().copy_from_slice(&values);
    }

    let mut input = spaced_input(input_desc, 7);
    let output = layer.forward(&input).unwrap();
    let projection = spaced_input(*output.desc(), 9);
    let grads = layer.backward(&input, &output, &projection).unwrap();
    assert_eq!(grads.input.desc(), input.desc());
    assert_eq!(grads.parameters.len(), layer.parameters().len());

    for i in 0..input.len() {
        let original = input.data()[i];
        input.data_mut()[i] = original + EPS;
        let plus = projected_loss(layer, &input, &projection);
        input.data_mut()[i] = original - EPS;
        let minus = projected_loss(layer, &input, &projection);
        input.data_mut()[i] = original;
        assert_close((plus - minus) / (2.0 * EPS), grads.input.data()[i], "input");
    }

    for p in 0..grads.parameters.len() {
        let len = layer.parameters()[p].len();
        for i in 0..len {
            let original = layer.parameters()[p].data()[i];
            layer.parameters_mut()[p].data_mut()[i] = original + EPS;
            let plus = projected_loss(layer, &input, &projection);
            layer.parameters_mut()[p].data_mut()[i] = original - EPS;
            let minus = projected_loss(layer, &input, &projection);
            layer.parameters_mut()[p].data_mut()[i] = original;
            assert_close((plus - minus) / (2.0 * EPS), grads.parameters[p].data()[i], "parameter");
        }
    }
}
