/// [`glam::Vec3`] with a stable three float binary encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct Vec3(pub(crate) glam::Vec3);

impl From<glam::Vec3> for Vec3 {
    fn from(value: glam::Vec3) -> Self {
        Vec3(value)
    }
}
impl From<glam::Vec3A> for Vec3 {
    fn from(value: glam::Vec3A) -> Self {
        Vec3(value.into())
    }
}
impl From<Vec3> for glam::Vec3 {
    fn from(value: Vec3) -> Self {
        value.0
    }
}

impl bincode::Encode for Vec3 {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.0.x, encoder)?;
        bincode::Encode::encode(&self.0.y, encoder)?;
        bincode::Encode::encode(&self.0.z, encoder)?;
        Ok(())
    }
}

impl<Context> bincode::Decode<Context> for Vec3 {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self(glam::Vec3 {
            x: bincode::Decode::decode(decoder)?,
            y: bincode::Decode::decode(decoder)?,
            z: bincode::Decode::decode(decoder)?,
        }))
    }
}
impl<'de, Context> bincode::BorrowDecode<'de, Context> for Vec3 {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self(glam::Vec3 {
            x: bincode::Decode::decode(decoder)?,
            y: bincode::Decode::decode(decoder)?,
            z: bincode::Decode::decode(decoder)?,
        }))
    }
}
