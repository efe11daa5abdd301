use crate::ir::{Expression, Operator};

/// Bottom-up algebraic simplification.
///
/// Constants are folded through NOT, AND, OR, NAND and NOR; XOR operands are
/// simplified but the XOR itself is left alone. The result evaluates exactly
/// like the input and simplifying it again changes nothing.
pub fn simplify(expr: &Expression) -> Expression {
    match expr {
        Expression::Constant(_) | Expression::Signal(_) | Expression::StateIs(_) => expr.clone(),
        Expression::Operation(Operator::Not, operands) => {
            let operands: Vec<Expression> = operands.iter().map(simplify).collect();
            match operands.as_slice() {
                [Expression::Constant(value)] => Expression::Constant(!value),
                _ => Expression::Operation(Operator::Not, operands),
            }
        }
        Expression::Operation(Operator::Xor, operands) => {
            Expression::Operation(Operator::Xor, operands.iter().map(simplify).collect())
        }
        Expression::Operation(op, operands) => simplify_junction(*op, operands),
    }
}

fn simplify_junction(op: Operator, operands: &[Expression]) -> Expression {
    let (base, negated) = match op {
        Operator::And => (Operator::And, false),
        Operator::Or => (Operator::Or, false),
        Operator::Nand => (Operator::And, true),
        Operator::Nor => (Operator::Or, true),
        Operator::Not | Operator::Xor => unreachable!("{op} is not a junction"),
    };
    // AND ignores TRUE and is forced by FALSE; OR is the mirror image.
    let identity = base == Operator::And;
    let absorbing = !identity;

    let mut kept = Vec::with_capacity(operands.len());
    for operand in operands.iter().map(simplify) {
        match operand {
            Expression::Constant(value) if value == absorbing => {
                return Expression::Constant(absorbing ^ negated);
            }
            Expression::Constant(value) if value == identity => {}
            other => kept.push(other),
        }
    }

    match kept.len() {
        0 => Expression::Constant(identity ^ negated),
        1 => {
            let only = kept.remove(0);
            if negated { Expression::not(only) } else { only }
        }
        _ => Expression::Operation(op, kept),
    }
}
